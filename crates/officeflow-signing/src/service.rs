//! Signature service trait

use async_trait::async_trait;

use crate::error::SigningError;
use crate::request::{SignRequest, SignedDocument};

/// Anything that can put a signature on a PDF
#[async_trait]
pub trait SignatureService: Send + Sync + std::fmt::Debug {
    /// Service name for logs
    fn name(&self) -> &str;

    /// Check if the service is reachable
    async fn is_available(&self) -> bool;

    /// Sign one document
    async fn sign(&self, request: &SignRequest) -> Result<SignedDocument, SigningError>;
}
