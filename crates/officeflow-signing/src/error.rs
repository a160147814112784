//! Signing errors

use thiserror::Error;

/// Errors from a signature service
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SigningError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),
    #[error("Request timed out")]
    Timeout,
    #[error("Rate limited by signing service")]
    RateLimited,
    #[error("Signing service error ({status}): {message}")]
    Server { status: u16, message: String },
    #[error("Request rejected ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
    #[error("Client configuration error: {0}")]
    Configuration(String),
}

impl SigningError {
    /// Whether retrying the same request may succeed
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::ConnectionFailed(_) | Self::Timeout | Self::RateLimited | Self::Server { .. }
        )
    }

    /// Map a non-success HTTP status to an error
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            429 => Self::RateLimited,
            408 => Self::Timeout,
            500..=599 => Self::Server { status, message },
            _ => Self::Rejected { status, message },
        }
    }
}

impl From<reqwest::Error> for SigningError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_connect() || err.is_request() {
            Self::ConnectionFailed(err.to_string())
        } else if err.is_decode() {
            Self::InvalidResponse(err.to_string())
        } else if let Some(status) = err.status() {
            Self::from_status(status.as_u16(), err.to_string())
        } else {
            Self::ConnectionFailed(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(SigningError::from_status(429, ""), SigningError::RateLimited);
        assert!(SigningError::from_status(503, "down").is_transient());
        assert!(!SigningError::from_status(400, "bad pdf").is_transient());
        assert!(matches!(
            SigningError::from_status(422, "no pages"),
            SigningError::Rejected { status: 422, .. }
        ));
    }
}
