//! Queue item definitions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

use crate::config::duration_ms;

/// Queue item identifier
pub type ItemId = Uuid;

/// Exponents above this already exceed any sane delay cap.
const MAX_EXPONENT: u32 = 32;

/// Item lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    /// Waiting for a slot (or waiting out a retry delay)
    Pending,
    /// Currently running
    Active,
    /// Finished successfully
    Completed,
    /// Gave up after exhausting retries
    Failed,
}

impl ItemStatus {
    pub fn is_finished(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// Retry backoff strategy
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BackoffStrategy {
    Constant {
        #[serde(rename = "delay_ms", with = "duration_ms")]
        delay: Duration,
    },
    Exponential {
        #[serde(rename = "initial_ms", with = "duration_ms")]
        initial: Duration,
        multiplier: f64,
        #[serde(rename = "max_ms", with = "duration_ms")]
        max: Duration,
    },
}

impl BackoffStrategy {
    /// Doubling backoff starting at `initial`, capped at `max`
    pub fn exponential(initial: Duration, max: Duration) -> Self {
        Self::Exponential {
            initial,
            multiplier: 2.0,
            max,
        }
    }

    /// Delay to wait after the failure of attempt `attempt` (0-based).
    ///
    /// Never decreases as `attempt` grows: multipliers below 1 are treated as 1.
    pub fn delay(&self, attempt: u32) -> Duration {
        match *self {
            Self::Constant { delay } => delay,
            Self::Exponential {
                initial,
                multiplier,
                max,
            } => {
                let exponent = attempt.min(MAX_EXPONENT) as i32;
                let nanos = initial.as_nanos() as f64 * multiplier.max(1.0).powi(exponent);
                if !nanos.is_finite() || nanos >= max.as_nanos() as f64 {
                    return max;
                }
                Duration::from_nanos(nanos as u64).min(max)
            }
        }
    }
}

/// How often and how patiently an item is retried
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Retries after the first attempt; total attempts is `max_retries + 1`
    pub max_retries: u32,
    pub backoff: BackoffStrategy,
}

impl RetryPolicy {
    /// Exponential policy: `initial_delay * 2^attempt`, capped at `max_delay`
    pub fn exponential(max_retries: u32, initial_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_retries,
            backoff: BackoffStrategy::exponential(initial_delay, max_delay.max(initial_delay)),
        }
    }

    /// Same delay before every retry
    pub fn constant(max_retries: u32, delay: Duration) -> Self {
        Self {
            max_retries,
            backoff: BackoffStrategy::Constant { delay },
        }
    }

    /// Run once, never retry
    pub fn no_retry() -> Self {
        Self::constant(0, Duration::ZERO)
    }

    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.backoff.delay(attempt)
    }
}

/// Read-only view of a queue item, safe to hand to observers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemSnapshot {
    pub id: ItemId,
    pub label: String,
    pub status: ItemStatus,
    /// Attempts started so far
    pub attempts: u32,
    pub retries_left: u32,
    /// Delay that will apply after the next failure
    #[serde(rename = "retry_delay_ms", with = "duration_ms")]
    pub retry_delay: Duration,
    pub last_error: Option<String>,
    pub enqueued_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    /// Set while the item waits out a backoff delay
    pub retry_at: Option<DateTime<Utc>>,
}

impl ItemSnapshot {
    pub(crate) fn new(id: ItemId, label: String, policy: &RetryPolicy) -> Self {
        Self {
            id,
            label,
            status: ItemStatus::Pending,
            attempts: 0,
            retries_left: policy.max_retries,
            retry_delay: policy.delay_for(0),
            last_error: None,
            enqueued_at: Utc::now(),
            started_at: None,
            finished_at: None,
            retry_at: None,
        }
    }

    /// Whether the item is sitting out a backoff delay
    pub fn is_backing_off(&self) -> bool {
        self.status == ItemStatus::Pending && self.retry_at.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exponential_doubles() {
        let backoff =
            BackoffStrategy::exponential(Duration::from_millis(100), Duration::from_secs(60));
        assert_eq!(backoff.delay(0), Duration::from_millis(100));
        assert_eq!(backoff.delay(1), Duration::from_millis(200));
        assert_eq!(backoff.delay(2), Duration::from_millis(400));
        assert_eq!(backoff.delay(3), Duration::from_millis(800));
    }

    #[test]
    fn test_exponential_keeps_sub_millisecond_precision() {
        let backoff =
            BackoffStrategy::exponential(Duration::from_micros(500), Duration::from_secs(1));
        assert_eq!(backoff.delay(0), Duration::from_micros(500));
        assert_eq!(backoff.delay(1), Duration::from_millis(1));
        assert_eq!(backoff.delay(2), Duration::from_millis(2));

        let backoff =
            BackoffStrategy::exponential(Duration::from_micros(1500), Duration::from_secs(1));
        assert_eq!(backoff.delay(0), Duration::from_micros(1500));
        assert_eq!(backoff.delay(1), Duration::from_millis(3));
    }

    #[test]
    fn test_exponential_is_capped() {
        let backoff = BackoffStrategy::exponential(Duration::from_secs(1), Duration::from_secs(5));
        assert_eq!(backoff.delay(2), Duration::from_secs(4));
        assert_eq!(backoff.delay(3), Duration::from_secs(5));
        assert_eq!(backoff.delay(u32::MAX), Duration::from_secs(5));
    }

    #[test]
    fn test_delays_never_decrease() {
        let strategies = [
            BackoffStrategy::exponential(Duration::from_millis(7), Duration::from_secs(3)),
            BackoffStrategy::Exponential {
                initial: Duration::from_millis(50),
                multiplier: 0.5,
                max: Duration::from_secs(1),
            },
            BackoffStrategy::Constant {
                delay: Duration::from_millis(20),
            },
        ];

        for backoff in strategies {
            let mut previous = Duration::ZERO;
            for attempt in 0..64 {
                let delay = backoff.delay(attempt);
                assert!(delay >= previous, "{backoff:?} decreased at attempt {attempt}");
                previous = delay;
            }
        }
    }

    #[test]
    fn test_policy_max_below_initial_is_raised() {
        let policy = RetryPolicy::exponential(2, Duration::from_secs(2), Duration::from_secs(1));
        assert_eq!(policy.delay_for(0), Duration::from_secs(2));
        assert_eq!(policy.delay_for(5), Duration::from_secs(2));
    }

    #[test]
    fn test_status_serializes_lowercase() {
        let json = serde_json::to_string(&ItemStatus::Active).unwrap();
        assert_eq!(json, "\"active\"");
        assert!(ItemStatus::Failed.is_finished());
        assert!(!ItemStatus::Pending.is_finished());
    }
}
