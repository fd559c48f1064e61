//! Queue error types.

use serialq_core::ConfigError;
use thiserror::Error;

/// Errors surfaced by the queue's public API.
///
/// Submission itself never fails; these only come out of construction and
/// of [`TaskQueue::submit_and_wait`](crate::TaskQueue::submit_and_wait).
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("no tokio runtime is available to drive the queue")]
    NoRuntime,

    #[error("invalid queue config: {0}")]
    Config(#[from] ConfigError),

    /// The task finished without handing back a value: it was merged into a
    /// newer submission, skipped by its condition, panicked, or was aborted.
    #[error("task was discarded before producing a result")]
    Discarded,

    #[error("task callback failed: {0}")]
    Callback(String),
}
