use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::{Duration, Instant};

use futures::future::BoxFuture;
use tracing::{debug, warn};

use crate::metrics::TaskOutcome;
use crate::reentrancy::{self, DrainMarker};
use crate::state::{QueueState, RunningTask};
use crate::task::{Awareness, Callback, TaskFuture, TaskId, TaskRecord};

use super::TaskQueue;

/// What a drain pass decided under the lock.
#[derive(Debug)]
pub(super) enum Step {
    /// Nothing pending.
    Empty,
    /// The front task cannot start yet; the trigger was recorded.
    GaveUp,
    /// The front task, now on the running stack.
    Run(TaskRecord),
}

impl QueueState {
    /// Pop the front task if the queue may run it now, otherwise record the
    /// trigger for replay. Delay is not checked here; it only withholds the
    /// trigger.
    pub(super) fn next_step(&mut self, target: TaskId) -> Step {
        if self.queue.is_empty() {
            return Step::Empty;
        }
        if !self.can_start_front() {
            self.giveup.push(target);
            return Step::GaveUp;
        }
        match self.queue.pop_front() {
            Some(record) => {
                self.running
                    .push(RunningTask::new(record.id(), record.is_recursive()));
                Step::Run(record)
            }
            None => Step::Empty,
        }
    }
}

impl TaskQueue {
    /// Issue a drain trigger for `target` on the queue's runtime.
    pub(super) fn spawn_drain(&self, target: TaskId) {
        self.inner.runtime.spawn(self.drain_task(target));
    }

    /// Boxed so drains can be spawned from inside a drain.
    pub(super) fn drain_task(&self, target: TaskId) -> BoxFuture<'static, ()> {
        let queue = self.clone();
        Box::pin(async move { queue.drain(target).await })
    }

    /// Run front tasks until `target` has run or been discarded, the queue
    /// runs dry, or the queue turns out to be busy. Children queued by a
    /// finished task are run before returning, even past `target`.
    pub(super) async fn drain(&self, target: TaskId) {
        let mut replay = Vec::new();
        let mut step = self.inner.lock_state().next_step(target);

        loop {
            let record = match step {
                Step::Empty => break,
                Step::GaveUp => {
                    self.inner.with_metrics(|m| m.giveups += 1);
                    debug!(
                        queue = %self.inner.config.name,
                        target = %target,
                        "queue busy, drain trigger deferred"
                    );
                    break;
                }
                Step::Run(record) => record,
            };

            let id = record.id();
            let recursive = record.is_recursive();
            let waiting_parent = record.waiting_parent();
            let started = Instant::now();
            let outcome = self.execute(record).await;
            let elapsed = started.elapsed();

            step = {
                let mut state = self.inner.lock_state();
                state.finish(id);
                if let Some(parent) = waiting_parent {
                    state.release_waiter(parent);
                }
                // A non-recursive task releases the queue; a recursive one
                // does so only when nothing else is left running.
                if (!recursive || !state.is_busy()) && !state.giveup.is_empty() {
                    replay.append(&mut state.giveup);
                }
                if id != target {
                    state.next_step(target)
                } else if state.front_is_recursive() && state.can_start_front() {
                    // Popped in the same critical section so no other drain
                    // can slip in between a parent and its children.
                    state.next_step(target)
                } else {
                    Step::Empty
                }
            };
            self.inner.with_metrics(|m| m.record_outcome(outcome, elapsed));
            self.inner.progress.notify_waiters();
        }

        if !replay.is_empty() {
            self.spawn_replay(replay);
        }
    }

    /// Evaluate the condition, then run the callback inside the drain scope.
    /// Nothing a callback does escapes this function.
    async fn execute(&self, mut record: TaskRecord) -> TaskOutcome {
        record.cancel_timer();
        let TaskRecord {
            info,
            merged,
            callback,
            condition,
            ..
        } = record;
        let id = info.id;
        let name = &self.inner.config.name;

        if let Some(condition) = condition {
            match catch_unwind(AssertUnwindSafe(condition)) {
                Ok(true) => {}
                Ok(false) => {
                    debug!(queue = %name, task_id = %id, "condition false, task skipped");
                    return TaskOutcome::Skipped;
                }
                Err(panic) => {
                    warn!(queue = %name, task_id = %id, panic = %panic_message(&*panic), "task condition panicked");
                    return TaskOutcome::ConditionFailed;
                }
            }
        }

        let timeout = info.timeout.unwrap_or_else(|| self.inner.config.default_timeout());
        let marker = DrainMarker {
            queue: self.inner.id,
            task: id,
        };
        let awareness = Awareness::new(info, merged);

        match callback {
            Callback::Sync(f) => {
                let result = catch_unwind(AssertUnwindSafe(|| {
                    reentrancy::enter_sync(marker, || f(&awareness))
                }));
                match result {
                    Ok(Ok(())) => TaskOutcome::Completed,
                    Ok(Err(e)) => {
                        warn!(queue = %name, task_id = %id, error = %format!("{e:#}"), "task failed");
                        TaskOutcome::Failed
                    }
                    Err(panic) => {
                        warn!(queue = %name, task_id = %id, panic = %panic_message(&*panic), "task panicked");
                        TaskOutcome::Failed
                    }
                }
            }
            Callback::Async(f) => {
                let fut = match catch_unwind(AssertUnwindSafe(|| {
                    reentrancy::enter_sync(marker, || f(awareness))
                })) {
                    Ok(fut) => fut,
                    Err(panic) => {
                        warn!(queue = %name, task_id = %id, panic = %panic_message(&*panic), "task panicked");
                        return TaskOutcome::Failed;
                    }
                };
                self.await_callback(id, marker, fut, timeout).await
            }
        }
    }

    /// Race a spawned async callback against its timeout. On timeout the
    /// callback keeps running detached unless `abort_on_timeout` is set.
    async fn await_callback(
        &self,
        id: TaskId,
        marker: DrainMarker,
        fut: TaskFuture,
        timeout: Duration,
    ) -> TaskOutcome {
        let name = &self.inner.config.name;
        let handle = self.inner.runtime.spawn(reentrancy::enter(marker, fut));
        let abort = handle.abort_handle();

        match tokio::time::timeout(timeout, handle).await {
            Ok(Ok(Ok(()))) => TaskOutcome::Completed,
            Ok(Ok(Err(e))) => {
                warn!(queue = %name, task_id = %id, error = %format!("{e:#}"), "task failed");
                TaskOutcome::Failed
            }
            Ok(Err(join_err)) => {
                if join_err.is_panic() {
                    let panic = join_err.into_panic();
                    warn!(queue = %name, task_id = %id, panic = %panic_message(&*panic), "task panicked");
                } else {
                    warn!(queue = %name, task_id = %id, "task was cancelled");
                }
                TaskOutcome::Failed
            }
            Err(_) => {
                warn!(
                    queue = %name,
                    task_id = %id,
                    timeout_ms = timeout.as_millis() as u64,
                    aborted = self.inner.config.abort_on_timeout,
                    "task timed out, no longer waiting on it"
                );
                if self.inner.config.abort_on_timeout {
                    abort.abort();
                }
                TaskOutcome::TimedOut
            }
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
