//! In-memory bookkeeping behind the status snapshot

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::time::Duration;
use uuid::Uuid;

use crate::item::{ItemId, ItemSnapshot, ItemStatus, RetryPolicy};

/// Point-in-time view of the queue for polling observers
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueueStatus {
    /// Items waiting for a slot, including those in backoff
    pub pending: usize,
    pub active: usize,
    pub concurrency: usize,
    /// Completed since the queue was created
    pub completed: u64,
    /// Failed since the queue was created
    pub failed: u64,
    /// Oldest first
    pub active_items: Vec<ItemSnapshot>,
    /// In admission order
    pub pending_items: Vec<ItemSnapshot>,
    /// Most recently finished first
    pub recent: Vec<ItemSnapshot>,
}

impl QueueStatus {
    pub fn is_idle(&self) -> bool {
        self.pending == 0 && self.active == 0
    }
}

#[derive(Debug)]
struct LiveItem {
    snapshot: ItemSnapshot,
    /// Position in the admission FIFO, refreshed when a retry re-enters it
    seq: u64,
}

#[derive(Debug)]
pub(crate) struct QueueState {
    live: HashMap<ItemId, LiveItem>,
    next_seq: u64,
    recent: VecDeque<ItemSnapshot>,
    recent_capacity: usize,
    completed: u64,
    failed: u64,
}

impl QueueState {
    pub(crate) fn new(recent_capacity: usize) -> Self {
        Self {
            live: HashMap::new(),
            next_seq: 0,
            recent: VecDeque::with_capacity(recent_capacity),
            recent_capacity,
            completed: 0,
            failed: 0,
        }
    }

    pub(crate) fn insert(&mut self, label: String, policy: &RetryPolicy) -> ItemId {
        let id = Uuid::new_v4();
        let seq = self.bump_seq();
        self.live.insert(
            id,
            LiveItem {
                snapshot: ItemSnapshot::new(id, label, policy),
                seq,
            },
        );
        id
    }

    pub(crate) fn mark_active(&mut self, id: ItemId) {
        if let Some(item) = self.live.get_mut(&id) {
            let snapshot = &mut item.snapshot;
            snapshot.status = ItemStatus::Active;
            snapshot.attempts += 1;
            snapshot.retry_at = None;
            snapshot.started_at = Some(Utc::now());
        }
    }

    /// Attempt failed and will be retried after `delay`
    pub(crate) fn mark_retrying(
        &mut self,
        id: ItemId,
        error: String,
        delay: Duration,
        next_delay: Duration,
    ) {
        if let Some(item) = self.live.get_mut(&id) {
            let snapshot = &mut item.snapshot;
            snapshot.status = ItemStatus::Pending;
            snapshot.retries_left = snapshot.retries_left.saturating_sub(1);
            snapshot.retry_delay = next_delay;
            snapshot.last_error = Some(error);
            let retry_at = ChronoDuration::from_std(delay)
                .ok()
                .and_then(|delay| Utc::now().checked_add_signed(delay))
                .unwrap_or(DateTime::<Utc>::MAX_UTC);
            snapshot.retry_at = Some(retry_at);
        }
    }

    /// Backoff elapsed; the item rejoins the tail of the FIFO
    pub(crate) fn requeue(&mut self, id: ItemId) {
        let seq = self.bump_seq();
        if let Some(item) = self.live.get_mut(&id) {
            item.seq = seq;
            item.snapshot.retry_at = None;
        }
    }

    pub(crate) fn finish(&mut self, id: ItemId, status: ItemStatus, error: Option<String>) {
        let Some(item) = self.live.remove(&id) else {
            return;
        };
        let mut snapshot = item.snapshot;
        snapshot.status = status;
        snapshot.finished_at = Some(Utc::now());
        snapshot.retry_at = None;
        if error.is_some() {
            snapshot.last_error = error;
        }

        match status {
            ItemStatus::Completed => self.completed += 1,
            ItemStatus::Failed => self.failed += 1,
            _ => {}
        }

        if self.recent.len() == self.recent_capacity {
            self.recent.pop_front();
        }
        self.recent.push_back(snapshot);
    }

    /// Drop an item whose caller went away; no counters change
    pub(crate) fn withdraw(&mut self, id: ItemId) -> bool {
        self.live.remove(&id).is_some()
    }

    pub(crate) fn snapshot(&self, concurrency: usize) -> QueueStatus {
        let mut active: Vec<&LiveItem> = Vec::new();
        let mut pending: Vec<&LiveItem> = Vec::new();
        for item in self.live.values() {
            match item.snapshot.status {
                ItemStatus::Active => active.push(item),
                _ => pending.push(item),
            }
        }
        active.sort_by_key(|item| item.snapshot.started_at);
        pending.sort_by_key(|item| item.seq);

        QueueStatus {
            pending: pending.len(),
            active: active.len(),
            concurrency,
            completed: self.completed,
            failed: self.failed,
            active_items: active.into_iter().map(|i| i.snapshot.clone()).collect(),
            pending_items: pending.into_iter().map(|i| i.snapshot.clone()).collect(),
            recent: self.recent.iter().rev().cloned().collect(),
        }
    }

    fn bump_seq(&mut self) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        seq
    }
}
