//! # OfficeFlow Queue
//!
//! Client-side admission control for slow external APIs.
//!
//! Features:
//! - At most `concurrency` requests in flight, FIFO admission
//! - Retry with exponential (or constant) backoff
//! - Polling status snapshot for progress displays
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use officeflow_queue::{QueueConfig, RequestQueue};
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let queue = RequestQueue::new(QueueConfig::default())?;
//!
//! let body = queue
//!     .enqueue_with_retry("fetch report", 3, Duration::from_millis(500), || async {
//!         Ok::<_, std::io::Error>("report".to_string())
//!     })
//!     .await?;
//!
//! let status = queue.status();
//! println!("{} done, {} waiting", status.completed, status.pending);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod item;
pub mod queue;
mod state;

pub use config::QueueConfig;
pub use error::QueueError;
pub use item::{BackoffStrategy, ItemId, ItemSnapshot, ItemStatus, RetryPolicy};
pub use queue::RequestQueue;
pub use state::QueueStatus;
