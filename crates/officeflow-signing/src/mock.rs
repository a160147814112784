//! Mock signature service for testing

use async_trait::async_trait;
use chrono::Utc;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::error::SigningError;
use crate::request::{SignRequest, SignedDocument};
use crate::service::SignatureService;

/// In-process signer that appends a signature trailer to the PDF.
///
/// Failures can be scripted with [`fail_next`](Self::fail_next); they are
/// returned in order before any call succeeds.
#[derive(Debug)]
pub struct MockSignatureService {
    latency: Duration,
    scripted: Mutex<VecDeque<SigningError>>,
    calls: AtomicU32,
}

impl Default for MockSignatureService {
    fn default() -> Self {
        Self::new()
    }
}

impl MockSignatureService {
    pub fn new() -> Self {
        Self::with_latency(Duration::from_millis(10))
    }

    /// Each call takes `latency` before answering
    pub fn with_latency(latency: Duration) -> Self {
        Self {
            latency,
            scripted: Mutex::new(VecDeque::new()),
            calls: AtomicU32::new(0),
        }
    }

    /// Queue up an error for a future call
    pub fn fail_next(self, error: SigningError) -> Self {
        self.scripted
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(error);
        self
    }

    /// Fail the next `times` calls with a 503
    pub fn flaky(self, times: u32) -> Self {
        (0..times).fold(self, |mock, _| {
            mock.fail_next(SigningError::Server {
                status: 503,
                message: "signing backend busy".to_string(),
            })
        })
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SignatureService for MockSignatureService {
    fn name(&self) -> &str {
        "mock"
    }

    async fn is_available(&self) -> bool {
        true
    }

    async fn sign(&self, request: &SignRequest) -> Result<SignedDocument, SigningError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.latency).await;

        let scripted = self
            .scripted
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front();
        if let Some(error) = scripted {
            return Err(error);
        }
        request.validate()?;

        let signed_at = Utc::now();
        let mut pdf = request.pdf.clone();
        if !pdf.ends_with(b"\n") {
            pdf.push(b'\n');
        }
        pdf.extend_from_slice(
            format!(
                "%OfficeFlow-Signature signer={:?} page={} at={}\n",
                request.signer,
                request.placement.page,
                signed_at.to_rfc3339()
            )
            .as_bytes(),
        );

        Ok(SignedDocument {
            document_id: request.document_id.clone(),
            pdf,
            signer: request.signer.clone(),
            signed_at,
        })
    }
}
