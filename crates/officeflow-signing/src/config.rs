//! Signing service configuration

use officeflow_queue::config::duration_ms;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Where and how to reach the signing service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SigningConfig {
    /// Base URL (env: OFFICEFLOW_SIGNING_URL)
    pub base_url: String,
    /// Bearer token (env: OFFICEFLOW_SIGNING_TOKEN)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_token: Option<String>,
    /// Per-request timeout (env: OFFICEFLOW_SIGNING_TIMEOUT_MS)
    #[serde(rename = "timeout_ms", with = "duration_ms")]
    pub timeout: Duration,
}

impl Default for SigningConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8090".to_string(),
            api_token: None,
            timeout: Duration::from_secs(60),
        }
    }
}

impl SigningConfig {
    /// Load from environment, falling back to defaults for unset variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Override fields whose `OFFICEFLOW_SIGNING_*` variable is set
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Ok(url) = env::var("OFFICEFLOW_SIGNING_URL") {
            self.base_url = url;
        }
        if let Ok(token) = env::var("OFFICEFLOW_SIGNING_TOKEN") {
            self.api_token = Some(token);
        }
        if let Ok(raw) = env::var("OFFICEFLOW_SIGNING_TIMEOUT_MS") {
            let millis = raw.trim().parse().map_err(|_| {
                ConfigError::Invalid(format!("OFFICEFLOW_SIGNING_TIMEOUT_MS={raw:?}"))
            })?;
            self.timeout = Duration::from_millis(millis);
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(ConfigError::Invalid(format!(
                "base_url must be http(s): {}",
                self.base_url
            )));
        }
        if self.timeout.is_zero() {
            return Err(ConfigError::Invalid("timeout must be positive".to_string()));
        }
        Ok(())
    }

    /// `base_url` joined with `path`, without doubled slashes
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}
