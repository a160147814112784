//! Request queue: bounded concurrency with retry

use std::fmt::Display;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

use crate::config::QueueConfig;
use crate::error::QueueError;
use crate::item::{ItemId, ItemStatus, RetryPolicy};
use crate::state::{QueueState, QueueStatus};

/// Admission-controlled queue for calls to a slow external API.
///
/// Cloning is cheap; clones share the same slots and status.
#[derive(Debug, Clone)]
pub struct RequestQueue {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    config: QueueConfig,
    /// Fair semaphore, so waiters are admitted in FIFO order
    slots: Semaphore,
    state: Mutex<QueueState>,
}

impl RequestQueue {
    pub fn new(config: QueueConfig) -> Result<Self, QueueError> {
        config.validate()?;
        info!(
            concurrency = config.concurrency,
            max_retries = config.max_retries,
            "Request queue created"
        );
        Ok(Self {
            inner: Arc::new(Inner {
                slots: Semaphore::new(config.concurrency),
                state: Mutex::new(QueueState::new(config.recent_capacity)),
                config,
            }),
        })
    }

    /// Queue with default settings and the given concurrency limit
    pub fn with_concurrency(concurrency: usize) -> Result<Self, QueueError> {
        Self::new(QueueConfig::default().with_concurrency(concurrency))
    }

    pub fn config(&self) -> &QueueConfig {
        &self.inner.config
    }

    pub fn concurrency(&self) -> usize {
        self.inner.config.concurrency
    }

    /// Run `task` with the queue's default retry policy
    pub async fn enqueue<F, Fut, T, E>(&self, label: impl Into<String>, task: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let policy = self.inner.config.default_policy();
        self.enqueue_with_retry_if(label, policy, task, |_| true).await
    }

    /// Run `task`, retrying up to `max_retries` times with delays of
    /// `initial_delay * 2^attempt`, capped at the configured `max_delay`.
    ///
    /// Resolves with the task's value, or with its last error once retries run out.
    pub async fn enqueue_with_retry<F, Fut, T, E>(
        &self,
        label: impl Into<String>,
        max_retries: u32,
        initial_delay: Duration,
        task: F,
    ) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let policy =
            RetryPolicy::exponential(max_retries, initial_delay, self.inner.config.max_delay);
        self.enqueue_with_retry_if(label, policy, task, |_| true).await
    }

    pub async fn enqueue_with_policy<F, Fut, T, E>(
        &self,
        label: impl Into<String>,
        policy: RetryPolicy,
        task: F,
    ) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        self.enqueue_with_retry_if(label, policy, task, |_| true).await
    }

    /// Like [`enqueue_with_policy`](Self::enqueue_with_policy), but errors for which
    /// `should_retry` returns false fail the item immediately.
    pub async fn enqueue_with_retry_if<F, Fut, T, E, P>(
        &self,
        label: impl Into<String>,
        policy: RetryPolicy,
        mut task: F,
        should_retry: P,
    ) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
        P: Fn(&E) -> bool,
    {
        let label = label.into();
        let id = self.lock_state().insert(label.clone(), &policy);
        let mut ticket = Ticket {
            inner: &self.inner,
            id,
            live: true,
        };
        debug!(item_id = %id, label = %label, "Request enqueued");

        let mut attempt: u32 = 0;
        loop {
            let slot = self
                .inner
                .slots
                .acquire()
                .await
                .expect("Request queue semaphore is never closed");
            self.lock_state().mark_active(id);
            debug!(item_id = %id, label = %label, attempt = attempt + 1, "Request started");

            let err = match task().await {
                Ok(value) => {
                    self.lock_state().finish(id, ItemStatus::Completed, None);
                    ticket.live = false;
                    drop(slot);
                    info!(item_id = %id, label = %label, attempts = attempt + 1, "Request completed");
                    return Ok(value);
                }
                Err(err) => err,
            };

            if attempt >= policy.max_retries || !should_retry(&err) {
                self.lock_state()
                    .finish(id, ItemStatus::Failed, Some(err.to_string()));
                ticket.live = false;
                drop(slot);
                error!(
                    item_id = %id,
                    label = %label,
                    attempts = attempt + 1,
                    error = %err,
                    "Request failed permanently"
                );
                return Err(err);
            }

            let delay = policy.delay_for(attempt);
            attempt += 1;
            self.lock_state()
                .mark_retrying(id, err.to_string(), delay, policy.delay_for(attempt));
            drop(slot);
            warn!(
                item_id = %id,
                label = %label,
                attempt = attempt,
                max_retries = policy.max_retries,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "Request failed, retrying with backoff"
            );

            tokio::time::sleep(delay).await;
            self.lock_state().requeue(id);
        }
    }

    /// Snapshot for progress displays
    pub fn status(&self) -> QueueStatus {
        self.lock_state().snapshot(self.inner.config.concurrency)
    }

    fn lock_state(&self) -> MutexGuard<'_, QueueState> {
        self.inner.lock_state()
    }
}

impl Inner {
    fn lock_state(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Removes the item from the snapshot if its enqueue future is dropped early
struct Ticket<'a> {
    inner: &'a Inner,
    id: ItemId,
    live: bool,
}

impl Drop for Ticket<'_> {
    fn drop(&mut self) {
        if self.live && self.inner.lock_state().withdraw(self.id) {
            debug!(item_id = %self.id, "Request withdrawn before finishing");
        }
    }
}
