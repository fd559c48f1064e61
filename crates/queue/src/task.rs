//! Task records and the context handed to callbacks.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::task::AbortHandle;

/// Identity of a submitted task. Strictly increasing per queue, never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TaskId(pub(crate) u64);

impl TaskId {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Future returned by an asynchronous callback.
pub type TaskFuture = BoxFuture<'static, anyhow::Result<()>>;

/// Zero-argument predicate evaluated right before a task would run.
pub type Condition = Box<dyn FnOnce() -> bool + Send>;

/// The work a task performs.
pub enum Callback {
    /// Runs to completion inside the drain; no timeout applies.
    Sync(Box<dyn FnOnce(&Awareness) -> anyhow::Result<()> + Send>),
    /// Spawned as its own task and raced against the effective timeout.
    Async(Box<dyn FnOnce(Awareness) -> TaskFuture + Send>),
}

impl Callback {
    pub fn sync<F>(f: F) -> Self
    where
        F: FnOnce(&Awareness) -> anyhow::Result<()> + Send + 'static,
    {
        Callback::Sync(Box::new(f))
    }

    pub fn from_async<F, Fut>(f: F) -> Self
    where
        F: FnOnce(Awareness) -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        Callback::Async(Box::new(move |awareness| -> TaskFuture { Box::pin(f(awareness)) }))
    }

    pub fn is_async(&self) -> bool {
        matches!(self, Callback::Async(_))
    }
}

impl fmt::Debug for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Callback::Sync(_) => f.write_str("Callback::Sync"),
            Callback::Async(_) => f.write_str("Callback::Async"),
        }
    }
}

// ── Submission options ───────────────────────────────────────────────

/// Per-submission scheduling options.
///
/// # Example
/// ```ignore
/// let options = TaskOptions::new()
///     .key("save:doc-42")
///     .delay(Duration::from_millis(300))
///     .timeout(Duration::from_secs(2));
/// ```
#[derive(Default)]
pub struct TaskOptions {
    pub(crate) key: Option<String>,
    pub(crate) delay: Option<Duration>,
    pub(crate) condition: Option<Condition>,
    pub(crate) timeout: Option<Duration>,
    pub(crate) metadata: Option<Value>,
}

impl TaskOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge identity. A pending task with the same key is folded into this
    /// one. An empty key means "never merge".
    pub fn key(mut self, key: impl Into<String>) -> Self {
        let key = key.into();
        self.key = if key.is_empty() { None } else { Some(key) };
        self
    }

    /// Withhold the drain trigger for this long. Zero means no delay.
    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = if delay.is_zero() { None } else { Some(delay) };
        self
    }

    /// Skip the callback if this returns false at execution time.
    pub fn condition<F>(mut self, condition: F) -> Self
    where
        F: FnOnce() -> bool + Send + 'static,
    {
        self.condition = Some(Box::new(condition));
        self
    }

    /// How long the drain waits for an asynchronous callback.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Opaque diagnostic payload, visible in [`Awareness`].
    pub fn metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

impl fmt::Debug for TaskOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskOptions")
            .field("key", &self.key)
            .field("delay", &self.delay)
            .field("condition", &self.condition.is_some())
            .field("timeout", &self.timeout)
            .field("metadata", &self.metadata)
            .finish()
    }
}

// ── Task metadata ────────────────────────────────────────────────────

/// Read-only view of a task's scheduling metadata.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskInfo {
    pub id: TaskId,
    pub key: Option<String>,
    /// Submitted from inside a running callback of the same queue.
    pub recursive: bool,
    /// The task whose callback submitted this one, when recursive.
    pub parent: Option<TaskId>,
    pub delay: Option<Duration>,
    pub timeout: Option<Duration>,
    pub metadata: Option<Value>,
    pub submitted_at: DateTime<Utc>,
}

/// Context passed into every callback.
#[derive(Debug, Clone, Serialize)]
pub struct Awareness {
    task: TaskInfo,
    merged_tasks: Vec<TaskInfo>,
}

impl Awareness {
    pub(crate) fn new(task: TaskInfo, merged_tasks: Vec<TaskInfo>) -> Self {
        Self { task, merged_tasks }
    }

    /// The task being executed.
    pub fn task(&self) -> &TaskInfo {
        &self.task
    }

    /// Tasks collapsed into this one, oldest first, ending with the
    /// immediate predecessor. Empty if no merge happened.
    pub fn merged_tasks(&self) -> &[TaskInfo] {
        &self.merged_tasks
    }

    pub fn was_merged(&self) -> bool {
        !self.merged_tasks.is_empty()
    }
}

// ── Task record ──────────────────────────────────────────────────────

/// A queued unit of work plus its scheduling state.
pub(crate) struct TaskRecord {
    pub(crate) info: TaskInfo,
    pub(crate) merged: Vec<TaskInfo>,
    pub(crate) callback: Callback,
    pub(crate) condition: Option<Condition>,
    /// Its parent is suspended in `submit_and_wait` on this task.
    pub(crate) awaited: bool,
    /// Aborts the pending delay timer. Never touches a running drain.
    pub(crate) canceller: Option<AbortHandle>,
}

impl TaskRecord {
    pub(crate) fn id(&self) -> TaskId {
        self.info.id
    }

    pub(crate) fn is_recursive(&self) -> bool {
        self.info.recursive
    }

    /// The parent to release once this task is done, if it waits on it.
    pub(crate) fn waiting_parent(&self) -> Option<TaskId> {
        self.info.parent.filter(|_| self.awaited)
    }

    pub(crate) fn has_pending_timer(&self) -> bool {
        self.canceller.is_some()
    }

    /// Cancel the delay timer, if one is still armed. Returns whether one was.
    pub(crate) fn cancel_timer(&mut self) -> bool {
        match self.canceller.take() {
            Some(handle) => {
                handle.abort();
                true
            }
            None => false,
        }
    }
}

impl fmt::Debug for TaskRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskRecord")
            .field("info", &self.info)
            .field("merged", &self.merged.len())
            .field("callback", &self.callback)
            .field("condition", &self.condition.is_some())
            .field("awaited", &self.awaited)
            .field("timer", &self.canceller.is_some())
            .finish()
    }
}
