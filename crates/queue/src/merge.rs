//! Key-merge resolver.
//!
//! Collapses a pending same-key task into the newest submission. The queue
//! holds at most one pending task per key, so a linear scan finds it.

use std::collections::VecDeque;

use crate::task::{TaskInfo, TaskRecord};

/// Remove the pending task carrying `key`, if any.
pub(crate) fn take_pending(queue: &mut VecDeque<TaskRecord>, key: &str) -> Option<TaskRecord> {
    let pos = queue
        .iter()
        .position(|t| t.info.key.as_deref() == Some(key))?;
    queue.remove(pos)
}

/// Fold a removed task into the provenance list of its successor:
/// `[...removed.merged, removed]`, oldest first. Cancels its delay timer and
/// drops its callback.
pub(crate) fn fold(mut removed: TaskRecord) -> Vec<TaskInfo> {
    removed.cancel_timer();
    let TaskRecord { info, mut merged, .. } = removed;
    merged.push(info);
    merged
}
