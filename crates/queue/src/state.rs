use std::collections::VecDeque;

use serde::Serialize;

use crate::task::{TaskId, TaskRecord};

/// A task that is currently executing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RunningTask {
    pub id: TaskId,
    pub recursive: bool,
    /// Children this task is suspended on through `submit_and_wait`.
    pub awaiting: u32,
}

impl RunningTask {
    pub(crate) fn new(id: TaskId, recursive: bool) -> Self {
        Self { id, recursive, awaiting: 0 }
    }
}

/// The only mutable shared state of a queue. Guarded by one mutex; the
/// lock is never held across an await point or a callback body.
#[derive(Debug, Default)]
pub(crate) struct QueueState {
    /// Pending tasks in execution order.
    pub(crate) queue: VecDeque<TaskRecord>,
    /// Running tasks, innermost last. A child only starts on top of its
    /// parent while the parent is suspended awaiting it; the top entry is the
    /// ongoing task. Anything else only starts from an empty stack.
    pub(crate) running: Vec<RunningTask>,
    /// Drain triggers that arrived while the queue was busy.
    pub(crate) giveup: Vec<TaskId>,
    last_id: u64,
}

impl QueueState {
    pub(crate) fn allocate_id(&mut self) -> TaskId {
        self.last_id += 1;
        TaskId(self.last_id)
    }

    pub(crate) fn ongoing(&self) -> Option<TaskId> {
        self.running.last().map(|r| r.id)
    }

    pub(crate) fn is_busy(&self) -> bool {
        !self.running.is_empty()
    }

    pub(crate) fn is_idle(&self) -> bool {
        self.queue.is_empty() && self.running.is_empty()
    }

    pub(crate) fn is_running(&self, id: TaskId) -> bool {
        self.running.iter().any(|r| r.id == id)
    }

    pub(crate) fn front_is_recursive(&self) -> bool {
        self.queue.front().is_some_and(|t| t.is_recursive())
    }

    /// Whether the front task may start now: the queue is idle, or the front
    /// is a child of the ongoing task and that task is suspended on a child.
    pub(crate) fn can_start_front(&self) -> bool {
        let Some(front) = self.queue.front() else {
            return false;
        };
        match self.running.last() {
            None => true,
            Some(top) => front.info.parent == Some(top.id) && top.awaiting > 0,
        }
    }

    /// A running task starts waiting on one of its children.
    pub(crate) fn hold_waiter(&mut self, parent: TaskId) {
        if let Some(entry) = self.running.iter_mut().find(|r| r.id == parent) {
            entry.awaiting += 1;
        }
    }

    /// An awaited child finished or was merged away.
    pub(crate) fn release_waiter(&mut self, parent: TaskId) {
        if let Some(entry) = self.running.iter_mut().find(|r| r.id == parent) {
            entry.awaiting = entry.awaiting.saturating_sub(1);
        }
    }

    /// Drop a finished task from the running stack, wherever it sits.
    pub(crate) fn finish(&mut self, id: TaskId) {
        if let Some(pos) = self.running.iter().rposition(|r| r.id == id) {
            self.running.remove(pos);
        }
    }

    /// Cancel every armed delay timer among pending tasks.
    pub(crate) fn cancel_pending_timers(&mut self) -> usize {
        self.queue
            .iter_mut()
            .map(|t| t.cancel_timer())
            .filter(|cancelled| *cancelled)
            .count()
    }

    pub(crate) fn snapshot(&self) -> QueueSnapshot {
        QueueSnapshot {
            pending: self
                .queue
                .iter()
                .map(|t| PendingTask {
                    id: t.id(),
                    key: t.info.key.clone(),
                    recursive: t.is_recursive(),
                    delayed: t.has_pending_timer(),
                })
                .collect(),
            ongoing: self.ongoing(),
            running: self.running.clone(),
            giveup: self.giveup.clone(),
        }
    }
}

/// Serializable point-in-time view of a queue.
#[derive(Debug, Clone, Serialize)]
pub struct QueueSnapshot {
    pub pending: Vec<PendingTask>,
    pub ongoing: Option<TaskId>,
    pub running: Vec<RunningTask>,
    pub giveup: Vec<TaskId>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PendingTask {
    pub id: TaskId,
    pub key: Option<String>,
    pub recursive: bool,
    /// Its delay timer has not fired or been cancelled yet.
    pub delayed: bool,
}
