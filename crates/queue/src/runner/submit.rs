use std::future::Future;
use std::time::Duration;

use chrono::Utc;
use futures::future::BoxFuture;
use tokio::sync::oneshot;
use tracing::debug;

use crate::error::QueueError;
use crate::merge;
use crate::reentrancy;
use crate::task::{Awareness, Callback, TaskId, TaskInfo, TaskOptions, TaskRecord};

use super::TaskQueue;

impl TaskQueue {
    /// Submit a task. Never fails and never suspends.
    ///
    /// A pending task with the same key is folded into this one. A submission
    /// made from inside one of this queue's running callbacks is recursive and
    /// runs ahead of already-queued work, once the submitting callback is
    /// done. Without a delay the drain trigger is issued right away; with one
    /// it is issued when the delay timer fires.
    pub fn submit(&self, callback: Callback, options: TaskOptions) -> TaskId {
        self.enqueue(callback, options, false)
    }

    /// `awaited` marks a child its parent is about to suspend on; only such a
    /// child may start while its parent is still running.
    fn enqueue(&self, callback: Callback, options: TaskOptions, awaited: bool) -> TaskId {
        let TaskOptions {
            key,
            delay,
            condition,
            timeout,
            metadata,
        } = options;
        let scope_parent = reentrancy::current_parent(self.inner.id);

        let (id, parent, awaited, merged_ids) = {
            let mut state = self.inner.lock_state();
            let id = state.allocate_id();
            // A callback that outlived its drain (timed out, detached) no
            // longer submits recursively.
            let parent = scope_parent.filter(|p| state.is_running(*p));
            let awaited = awaited && parent.is_some();

            let removed = key
                .as_deref()
                .and_then(|k| merge::take_pending(&mut state.queue, k));
            if let Some(waiting) = removed.as_ref().and_then(|r| r.waiting_parent()) {
                state.release_waiter(waiting);
            }
            let merged = removed.map(merge::fold);
            let merged_ids: Vec<TaskId> = merged
                .iter()
                .flatten()
                .map(|t| t.id)
                .collect();

            let mut record = TaskRecord {
                info: TaskInfo {
                    id,
                    key,
                    recursive: parent.is_some(),
                    parent,
                    delay,
                    timeout,
                    metadata,
                    submitted_at: Utc::now(),
                },
                merged: merged.unwrap_or_default(),
                callback,
                condition,
                awaited,
                canceller: None,
            };

            // Armed under the lock so the timer's drain cannot run before
            // the record is queued.
            if let Some(delay) = delay {
                let timer = self.inner.runtime.spawn(self.delay_timer(id, delay));
                record.canceller = Some(timer.abort_handle());
            }
            if let Some(parent) = parent.filter(|_| awaited) {
                state.hold_waiter(parent);
            }

            let index = reentrancy::insertion_index(&state.queue, parent);
            state.queue.insert(index, record);
            (id, parent, awaited, merged_ids)
        };

        self.inner
            .with_metrics(|m| m.record_submission(parent.is_some(), !merged_ids.is_empty()));
        debug!(
            queue = %self.inner.config.name,
            task_id = %id,
            parent = ?parent,
            awaited,
            merged = ?merged_ids,
            delay_ms = delay.map(|d| d.as_millis() as u64),
            "task submitted"
        );

        // A child nobody waits on is picked up by its parent's drain once the
        // parent is done.
        if delay.is_none() && (parent.is_none() || awaited) {
            self.spawn_drain(id);
        }
        id
    }

    /// Submit a synchronous callback.
    pub fn submit_sync<F>(&self, options: TaskOptions, f: F) -> TaskId
    where
        F: FnOnce(&Awareness) -> anyhow::Result<()> + Send + 'static,
    {
        self.submit(Callback::sync(f), options)
    }

    /// Submit an asynchronous callback.
    pub fn submit_async<F, Fut>(&self, options: TaskOptions, f: F) -> TaskId
    where
        F: FnOnce(Awareness) -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.submit(Callback::from_async(f), options)
    }

    /// Submit an asynchronous callback and wait for the value it produces.
    ///
    /// The queue itself still only logs failures; the caller sees them here
    /// because the value travels through its own channel. Resolves with
    /// [`QueueError::Discarded`] if the callback never delivers a value.
    ///
    /// Called from inside a running callback of the same queue, the child may
    /// run while the caller is suspended here.
    pub async fn submit_and_wait<T, F, Fut>(&self, options: TaskOptions, f: F) -> Result<T, QueueError>
    where
        T: Send + 'static,
        F: FnOnce(Awareness) -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let callback = Callback::from_async(move |awareness| async move {
            let result = f(awareness).await;
            let report = match &result {
                Ok(_) => Ok(()),
                Err(e) => Err(anyhow::anyhow!("{e:#}")),
            };
            let _ = tx.send(result);
            report
        });
        self.enqueue(callback, options, true);

        match rx.await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(QueueError::Callback(format!("{e:#}"))),
            Err(_) => Err(QueueError::Discarded),
        }
    }

    /// Sleep out a task's delay, then hand its drain trigger to a separate
    /// task. Aborting the timer can therefore never interrupt a drain.
    fn delay_timer(&self, id: TaskId, delay: Duration) -> BoxFuture<'static, ()> {
        let queue = self.clone();
        Box::pin(async move {
            tokio::time::sleep(delay).await;
            debug!(queue = %queue.inner.config.name, task_id = %id, "delay elapsed");
            queue.spawn_drain(id);
        })
    }
}
