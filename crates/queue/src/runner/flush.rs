use std::pin::pin;
use std::time::Instant;

use tracing::{debug, warn};

use crate::reentrancy;

use super::TaskQueue;

impl TaskQueue {
    /// Wait until the queue is idle, forcing pending work to run now.
    ///
    /// Every armed delay timer is cancelled and, whenever nothing is
    /// running, a drain is triggered for the front task. Tasks submitted
    /// while flushing are forced too. Completes immediately on an idle
    /// queue.
    ///
    /// Called from inside a running callback of this queue it returns at
    /// once without waiting: the queue cannot go idle before the caller
    /// itself finishes.
    pub async fn flush(&self) {
        if let Some(task) = reentrancy::current_parent(self.inner.id) {
            if self.inner.lock_state().is_running(task) {
                warn!(queue = %self.inner.config.name, task_id = %task, "flush called from a running task, not waiting");
                return;
            }
        }

        let started = Instant::now();
        let mut rounds = 0u64;

        loop {
            // Registered before the state check so a completion between the
            // check and the wait is not missed.
            let mut progress = pin!(self.inner.progress.notified());
            progress.as_mut().enable();

            let front = {
                let mut state = self.inner.lock_state();
                if state.is_idle() {
                    break;
                }
                let cancelled = state.cancel_pending_timers();
                if cancelled > 0 {
                    debug!(queue = %self.inner.config.name, cancelled, "flush cancelled delay timers");
                }
                if state.is_busy() {
                    None
                } else {
                    state.queue.front().map(|t| t.id())
                }
            };

            if let Some(id) = front {
                self.spawn_drain(id);
            }
            rounds += 1;

            tokio::select! {
                _ = progress => {}
                _ = tokio::time::sleep(self.inner.config.flush_poll_interval()) => {}
            }
            tokio::task::yield_now().await;
        }

        debug!(
            queue = %self.inner.config.name,
            rounds,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "queue flushed"
        );
    }
}
