//! Signature service behind the request queue
//!
//! Every `sign` call waits for a queue slot, and transient failures
//! (connection problems, timeouts, 429, 5xx) are retried with backoff.
//! Rejections are returned immediately.

use async_trait::async_trait;
use officeflow_queue::{QueueStatus, RequestQueue, RetryPolicy};
use std::sync::Arc;

use crate::error::SigningError;
use crate::request::{SignRequest, SignedDocument};
use crate::service::SignatureService;

#[derive(Debug)]
pub struct QueuedSigner<S: SignatureService> {
    inner: Arc<S>,
    queue: RequestQueue,
    policy: RetryPolicy,
}

impl<S: SignatureService> Clone for QueuedSigner<S> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            queue: self.queue.clone(),
            policy: self.policy,
        }
    }
}

impl<S: SignatureService> QueuedSigner<S> {
    /// Wrap `service`, retrying with the queue's default policy
    pub fn new(service: S, queue: RequestQueue) -> Self {
        Self::with_arc(Arc::new(service), queue)
    }

    /// Share an existing service handle
    pub fn with_arc(service: Arc<S>, queue: RequestQueue) -> Self {
        let policy = queue.config().default_policy();
        Self {
            inner: service,
            queue,
            policy,
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn service(&self) -> &S {
        &self.inner
    }

    pub fn queue(&self) -> &RequestQueue {
        &self.queue
    }

    /// Queue snapshot, for progress displays
    pub fn status(&self) -> QueueStatus {
        self.queue.status()
    }
}

#[async_trait]
impl<S: SignatureService + 'static> SignatureService for QueuedSigner<S> {
    fn name(&self) -> &str {
        "queued"
    }

    async fn is_available(&self) -> bool {
        self.inner.is_available().await
    }

    async fn sign(&self, request: &SignRequest) -> Result<SignedDocument, SigningError> {
        // not worth a slot if the service would reject it anyway
        request.validate()?;

        let inner = &self.inner;
        self.queue
            .enqueue_with_retry_if(
                format!("sign:{}", request.document_id),
                self.policy,
                move || inner.sign(request),
                SigningError::is_transient,
            )
            .await
    }
}
