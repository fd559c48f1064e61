use tracing::debug;

use crate::task::TaskId;

use super::TaskQueue;

impl TaskQueue {
    /// Re-issue deferred drain triggers, oldest first, one after the other.
    ///
    /// Runs as its own task so the drain that released the queue returns
    /// before any replayed work starts.
    pub(super) fn spawn_replay(&self, ids: Vec<TaskId>) {
        debug!(
            queue = %self.inner.config.name,
            count = ids.len(),
            ids = ?ids,
            "replaying deferred drain triggers"
        );
        self.inner.with_metrics(|m| m.giveup_replays += ids.len() as u64);
        let queue = self.clone();
        self.inner.runtime.spawn(async move {
            for id in ids {
                queue.drain_task(id).await;
            }
        });
    }
}
