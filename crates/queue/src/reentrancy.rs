//! Reentrancy classifier.
//!
//! The drain runs every callback inside a task-local scope naming the queue
//! and the running task. A submission made while that scope is active, for
//! the same queue, is recursive. Scopes do not leak into tasks the callback
//! spawns itself.

use std::collections::VecDeque;
use std::future::Future;

use uuid::Uuid;

use crate::task::{TaskId, TaskRecord};

tokio::task_local! {
    static DRAIN_SCOPE: DrainMarker;
}

/// "Currently draining" marker carried into a callback's execution context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct DrainMarker {
    pub(crate) queue: Uuid,
    pub(crate) task: TaskId,
}

/// The running task of `queue` whose callback is making this call, if any.
pub(crate) fn current_parent(queue: Uuid) -> Option<TaskId> {
    DRAIN_SCOPE
        .try_with(|marker| (marker.queue == queue).then_some(marker.task))
        .ok()
        .flatten()
}

/// Run a synchronous section with the marker in scope.
pub(crate) fn enter_sync<R>(marker: DrainMarker, f: impl FnOnce() -> R) -> R {
    DRAIN_SCOPE.sync_scope(marker, f)
}

/// Poll `fut` with the marker in scope.
pub(crate) fn enter<F: Future>(marker: DrainMarker, fut: F) -> impl Future<Output = F::Output> {
    DRAIN_SCOPE.scope(marker, fut)
}

/// Where a new task goes. Recursive tasks go to the front, behind siblings
/// already queued by the same parent; everything else goes to the back.
pub(crate) fn insertion_index(queue: &VecDeque<TaskRecord>, parent: Option<TaskId>) -> usize {
    match parent {
        Some(parent) => queue
            .iter()
            .take_while(|t| t.info.parent == Some(parent))
            .count(),
        None => queue.len(),
    }
}
