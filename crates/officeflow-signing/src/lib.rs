//! # OfficeFlow Signing
//!
//! Client for the external PDF-signing microservice.
//!
//! | Service | Use |
//! |---------|-----|
//! | `HttpSignatureService` | Real service over HTTP (`OFFICEFLOW_SIGNING_URL`) |
//! | `MockSignatureService` | Tests and dry runs |
//! | `QueuedSigner` | Wraps either one with bounded concurrency and retry |
//!
//! ```rust
//! use officeflow_queue::RequestQueue;
//! use officeflow_signing::{MockSignatureService, QueuedSigner, SignRequest, SignatureService};
//!
//! #[tokio::main]
//! async fn main() {
//!     let queue = RequestQueue::with_concurrency(2).unwrap();
//!     let signer = QueuedSigner::new(MockSignatureService::new(), queue);
//!
//!     let request = SignRequest::new("memo-1", b"%PDF-1.7".to_vec(), "Dana Reyes");
//!     let signed = signer.sign(&request).await.unwrap();
//!     assert_eq!(signed.document_id, "memo-1");
//! }
//! ```

pub mod config;
pub mod error;
pub mod http;
pub mod mock;
pub mod queued;
pub mod request;
pub mod service;

pub use config::{ConfigError, SigningConfig};
pub use error::SigningError;
pub use http::HttpSignatureService;
pub use mock::MockSignatureService;
pub use queued::QueuedSigner;
pub use request::{Placement, SignRequest, SignedDocument};
pub use service::SignatureService;
