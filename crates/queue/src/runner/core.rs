use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use serialq_core::QueueConfig;
use tokio::runtime::Handle;
use tokio::sync::Notify;
use tracing::info;
use uuid::Uuid;

use crate::error::QueueError;
use crate::metrics::QueueMetrics;
use crate::state::{QueueSnapshot, QueueState};

/// Serializes side-effecting work submitted by many callers.
///
/// At most one non-recursive callback runs at a time. Same-key pending
/// submissions collapse into the newest one, and submissions made from inside
/// a running callback jump ahead of already-queued work.
///
/// `TaskQueue` is a cheap handle; clones share the same queue.
#[derive(Clone)]
pub struct TaskQueue {
    pub(super) inner: Arc<Inner>,
}

pub(super) struct Inner {
    /// Distinguishes this queue's drain scopes from other queues'.
    pub(super) id: Uuid,
    pub(super) config: QueueConfig,
    /// Runtime that drives drains, delay timers and async callbacks.
    pub(super) runtime: Handle,
    pub(super) state: Mutex<QueueState>,
    pub(super) metrics: RwLock<QueueMetrics>,
    /// Signalled every time a task finishes.
    pub(super) progress: Notify,
}

impl TaskQueue {
    /// Create a queue driven by the current tokio runtime.
    pub fn new(config: QueueConfig) -> Result<Self, QueueError> {
        let runtime = Handle::try_current().map_err(|_| QueueError::NoRuntime)?;
        Self::with_runtime(config, runtime)
    }

    /// Create a queue driven by an explicit runtime handle. Submissions may
    /// then come from any thread.
    pub fn with_runtime(config: QueueConfig, runtime: Handle) -> Result<Self, QueueError> {
        config.validate()?;
        let id = Uuid::new_v4();
        info!(
            queue = %config.name,
            queue_id = %id,
            default_timeout_ms = config.default_timeout_ms,
            "task queue created"
        );
        Ok(Self {
            inner: Arc::new(Inner {
                id,
                config,
                runtime,
                state: Mutex::new(QueueState::default()),
                metrics: RwLock::new(QueueMetrics::default()),
                progress: Notify::new(),
            }),
        })
    }

    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    pub fn config(&self) -> &QueueConfig {
        &self.inner.config
    }

    /// Nothing pending and nothing running.
    pub fn is_idle(&self) -> bool {
        self.inner.lock_state().is_idle()
    }

    /// Number of tasks waiting to run.
    pub fn pending_len(&self) -> usize {
        self.inner.lock_state().queue.len()
    }

    /// Point-in-time view of pending, running and deferred work.
    pub fn snapshot(&self) -> QueueSnapshot {
        self.inner.lock_state().snapshot()
    }

    /// Get a snapshot of the current queue metrics.
    pub fn metrics(&self) -> QueueMetrics {
        self.inner
            .metrics
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Inner {
    /// Callbacks never run under this lock, so a poisoned guard still holds
    /// consistent state.
    pub(super) fn lock_state(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(super) fn with_metrics(&self, f: impl FnOnce(&mut QueueMetrics)) {
        let mut metrics = self.metrics.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut metrics);
    }
}

impl fmt::Debug for TaskQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskQueue")
            .field("name", &self.inner.config.name)
            .field("id", &self.inner.id)
            .finish_non_exhaustive()
    }
}
