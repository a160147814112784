//! Queue errors
//!
//! Task failures are never wrapped: the caller gets its own error type back.
//! These variants only cover constructing and configuring a queue.

#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("Invalid queue configuration: {0}")]
    InvalidConfig(String),
    #[error("Invalid value for {var}: {value:?}")]
    InvalidEnv { var: String, value: String },
}
