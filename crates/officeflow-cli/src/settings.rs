//! Layered CLI settings
//!
//! Built-in defaults, then an optional config file (`--config`, or
//! `officeflow.{toml,yaml,json}` in the working directory), then the
//! `OFFICEFLOW_QUEUE_*` / `OFFICEFLOW_SIGNING_*` environment variables.

use anyhow::{Context, Result};
use config::{Config, File};
use officeflow_queue::QueueConfig;
use officeflow_signing::SigningConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub queue: QueueConfig,
    pub signing: SigningConfig,
}

impl Settings {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let defaults = Config::try_from(&Settings::default())
            .context("Failed to serialize default settings")?;
        let file = match path {
            Some(path) => File::from(path).required(true),
            None => File::with_name("officeflow").required(false),
        };

        let mut settings: Settings = Config::builder()
            .add_source(defaults)
            .add_source(file)
            .build()
            .context("Failed to read configuration")?
            .try_deserialize()
            .context("Invalid configuration")?;

        settings.queue.apply_env()?;
        settings.signing.apply_env()?;
        settings.queue.validate()?;
        settings.signing.validate()?;
        debug!(
            concurrency = settings.queue.concurrency,
            signing_url = %settings.signing.base_url,
            "Settings loaded"
        );
        Ok(settings)
    }
}
