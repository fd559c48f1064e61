//! In-process serial task queue.
//!
//! Callers submit side-effecting callbacks; the queue runs them one at a
//! time in submission order, with three twists:
//! - same-key pending submissions collapse into the newest one
//! - submissions made from inside a running callback run next
//! - async callbacks are raced against a timeout so one hung task cannot
//!   stall everything behind it
//!
//! ```no_run
//! # async fn demo() -> Result<(), serialq_queue::QueueError> {
//! use std::time::Duration;
//! use serialq_queue::{QueueConfig, TaskOptions, TaskQueue};
//!
//! let queue = TaskQueue::new(QueueConfig::default())?;
//! queue.submit_sync(
//!     TaskOptions::new().key("save:doc-1").delay(Duration::from_millis(250)),
//!     |aware| {
//!         println!("saving, {} edits folded in", aware.merged_tasks().len());
//!         Ok(())
//!     },
//! );
//! queue.flush().await;
//! # Ok(())
//! # }
//! ```

pub mod error;
mod merge;
pub mod metrics;
mod reentrancy;
pub mod runner;
mod state;
pub mod task;

pub use error::QueueError;
pub use metrics::{QueueMetrics, TaskOutcome};
pub use runner::TaskQueue;
pub use serialq_core::QueueConfig;
pub use state::{PendingTask, QueueSnapshot, RunningTask};
pub use task::{Awareness, Callback, Condition, TaskFuture, TaskId, TaskInfo, TaskOptions};
