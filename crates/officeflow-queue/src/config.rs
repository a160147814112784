//! Queue configuration

use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;
use std::time::Duration;
use tokio::sync::Semaphore;

use crate::error::QueueError;
use crate::item::RetryPolicy;

/// Request queue configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Maximum requests in flight (env: OFFICEFLOW_QUEUE_CONCURRENCY)
    pub concurrency: usize,
    /// Finished items kept for the status snapshot (env: OFFICEFLOW_QUEUE_RECENT_CAPACITY)
    pub recent_capacity: usize,
    /// Default retries per item (env: OFFICEFLOW_QUEUE_MAX_RETRIES)
    pub max_retries: u32,
    /// First backoff delay (env: OFFICEFLOW_QUEUE_INITIAL_DELAY_MS)
    #[serde(rename = "initial_delay_ms", with = "duration_ms")]
    pub initial_delay: Duration,
    /// Backoff cap (env: OFFICEFLOW_QUEUE_MAX_DELAY_MS)
    #[serde(rename = "max_delay_ms", with = "duration_ms")]
    pub max_delay: Duration,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            concurrency: 3,
            recent_capacity: 10,
            max_retries: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl QueueConfig {
    /// Defaults overridden by any `OFFICEFLOW_QUEUE_*` variables that are set
    pub fn from_env() -> Result<Self, QueueError> {
        let mut config = Self::default();
        config.apply_env()?;
        Ok(config)
    }

    /// Override fields whose `OFFICEFLOW_QUEUE_*` variable is set
    pub fn apply_env(&mut self) -> Result<(), QueueError> {
        if let Some(v) = parse_env("OFFICEFLOW_QUEUE_CONCURRENCY")? {
            self.concurrency = v;
        }
        if let Some(v) = parse_env("OFFICEFLOW_QUEUE_RECENT_CAPACITY")? {
            self.recent_capacity = v;
        }
        if let Some(v) = parse_env("OFFICEFLOW_QUEUE_MAX_RETRIES")? {
            self.max_retries = v;
        }
        if let Some(ms) = parse_env("OFFICEFLOW_QUEUE_INITIAL_DELAY_MS")? {
            self.initial_delay = Duration::from_millis(ms);
        }
        if let Some(ms) = parse_env("OFFICEFLOW_QUEUE_MAX_DELAY_MS")? {
            self.max_delay = Duration::from_millis(ms);
        }
        Ok(())
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn validate(&self) -> Result<(), QueueError> {
        if self.concurrency == 0 {
            return Err(QueueError::InvalidConfig(
                "concurrency must be at least 1".to_string(),
            ));
        }
        if self.concurrency > Semaphore::MAX_PERMITS {
            return Err(QueueError::InvalidConfig(format!(
                "concurrency {} exceeds {}",
                self.concurrency,
                Semaphore::MAX_PERMITS
            )));
        }
        if self.recent_capacity == 0 {
            return Err(QueueError::InvalidConfig(
                "recent_capacity must be at least 1".to_string(),
            ));
        }
        if self.initial_delay > self.max_delay {
            return Err(QueueError::InvalidConfig(format!(
                "initial_delay {:?} is longer than max_delay {:?}",
                self.initial_delay, self.max_delay
            )));
        }
        Ok(())
    }

    /// Policy used by [`RequestQueue::enqueue`](crate::RequestQueue::enqueue)
    pub fn default_policy(&self) -> RetryPolicy {
        RetryPolicy::exponential(self.max_retries, self.initial_delay, self.max_delay)
    }
}

fn parse_env<T: FromStr>(var: &str) -> Result<Option<T>, QueueError> {
    match env::var(var) {
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| QueueError::InvalidEnv {
                var: var.to_string(),
                value,
            }),
        Err(_) => Ok(None),
    }
}

/// Serde helper storing a `Duration` as whole milliseconds
pub mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        let millis = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
        serializer.serialize_u64(millis)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const VARS: [&str; 5] = [
        "OFFICEFLOW_QUEUE_CONCURRENCY",
        "OFFICEFLOW_QUEUE_RECENT_CAPACITY",
        "OFFICEFLOW_QUEUE_MAX_RETRIES",
        "OFFICEFLOW_QUEUE_INITIAL_DELAY_MS",
        "OFFICEFLOW_QUEUE_MAX_DELAY_MS",
    ];

    fn clear_env() {
        for var in VARS {
            env::remove_var(var);
        }
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = QueueConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.concurrency, 3);
        assert_eq!(config.default_policy().max_retries, 3);
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let config = QueueConfig::default().with_concurrency(0);
        assert!(matches!(
            config.validate(),
            Err(QueueError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_initial_delay_above_cap_rejected() {
        let config = QueueConfig {
            initial_delay: Duration::from_secs(60),
            ..QueueConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_deserialize_millis_with_defaults() {
        let config: QueueConfig =
            serde_json::from_str(r#"{"concurrency": 2, "initial_delay_ms": 250}"#).unwrap();
        assert_eq!(config.concurrency, 2);
        assert_eq!(config.initial_delay, Duration::from_millis(250));
        assert_eq!(config.max_delay, Duration::from_secs(30));
    }

    #[test]
    #[serial]
    fn test_from_env_overrides_defaults() {
        clear_env();
        env::set_var("OFFICEFLOW_QUEUE_CONCURRENCY", "8");
        env::set_var("OFFICEFLOW_QUEUE_RECENT_CAPACITY", "25");
        env::set_var("OFFICEFLOW_QUEUE_MAX_RETRIES", "5");
        env::set_var("OFFICEFLOW_QUEUE_INITIAL_DELAY_MS", " 250 ");
        env::set_var("OFFICEFLOW_QUEUE_MAX_DELAY_MS", "4000");

        let config = QueueConfig::from_env();
        clear_env();

        let config = config.unwrap();
        assert_eq!(config.concurrency, 8);
        assert_eq!(config.recent_capacity, 25);
        assert_eq!(config.max_retries, 5);
        assert_eq!(config.initial_delay, Duration::from_millis(250));
        assert_eq!(config.max_delay, Duration::from_secs(4));
    }

    #[test]
    #[serial]
    fn test_apply_env_keeps_unset_fields() {
        clear_env();
        env::set_var("OFFICEFLOW_QUEUE_MAX_RETRIES", "0");

        let mut config = QueueConfig::default().with_concurrency(6);
        let result = config.apply_env();
        clear_env();

        result.unwrap();
        assert_eq!(config.concurrency, 6);
        assert_eq!(config.max_retries, 0);
        assert_eq!(config.initial_delay, Duration::from_secs(1));
    }

    #[test]
    #[serial]
    fn test_malformed_env_value_is_an_error() {
        clear_env();
        env::set_var("OFFICEFLOW_QUEUE_CONCURRENCY", "three");

        let result = QueueConfig::from_env();
        clear_env();

        match result {
            Err(QueueError::InvalidEnv { var, value }) => {
                assert_eq!(var, "OFFICEFLOW_QUEUE_CONCURRENCY");
                assert_eq!(value, "three");
            }
            other => panic!("expected InvalidEnv, got {other:?}"),
        }
    }

    #[test]
    #[serial]
    fn test_negative_retries_are_rejected() {
        clear_env();
        env::set_var("OFFICEFLOW_QUEUE_MAX_RETRIES", "-1");
        let result = QueueConfig::from_env();
        clear_env();
        assert!(matches!(result, Err(QueueError::InvalidEnv { .. })));
    }
}
