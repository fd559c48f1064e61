use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// How a dequeued task ended, from the drain's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TaskOutcome {
    Completed,
    /// Condition returned false; callback never ran.
    Skipped,
    /// Callback returned an error or panicked.
    Failed,
    /// Condition panicked; callback never ran.
    ConditionFailed,
    /// The drain stopped waiting; the callback may still be running.
    TimedOut,
}

/// Queue operational counters.
#[derive(Debug, Clone, Default, Serialize)]
pub struct QueueMetrics {
    pub submitted: u64,
    pub recursive_submissions: u64,
    /// Pending tasks folded into a newer same-key submission.
    pub merged: u64,
    /// Callbacks invoked (completed, failed or timed out).
    pub executed: u64,
    pub completed: u64,
    pub skipped: u64,
    /// Callbacks that errored or panicked, plus tasks whose condition
    /// panicked before the callback could run.
    pub failed: u64,
    pub timed_out: u64,
    /// Drain triggers deferred because the queue was busy.
    pub giveups: u64,
    /// Deferred triggers handed to a replay loop.
    pub giveup_replays: u64,
    pub avg_callback_duration: Duration,
    pub last_run: Option<DateTime<Utc>>,
}

impl QueueMetrics {
    pub fn record_submission(&mut self, recursive: bool, merged: bool) {
        self.submitted += 1;
        if recursive {
            self.recursive_submissions += 1;
        }
        if merged {
            self.merged += 1;
        }
    }

    /// Record a finished task.
    pub fn record_outcome(&mut self, outcome: TaskOutcome, duration: Duration) {
        match outcome {
            TaskOutcome::Skipped => {
                self.skipped += 1;
                return;
            }
            TaskOutcome::ConditionFailed => {
                self.failed += 1;
                return;
            }
            TaskOutcome::Completed => self.completed += 1,
            TaskOutcome::Failed => self.failed += 1,
            TaskOutcome::TimedOut => self.timed_out += 1,
        }
        self.executed += 1;
        self.last_run = Some(Utc::now());

        // Incremental mean: new_avg = prev_avg + (duration - prev_avg) / count
        self.avg_callback_duration = if self.executed == 1 {
            duration
        } else {
            let prev_nanos = self.avg_callback_duration.as_nanos() as f64;
            let cur_nanos = duration.as_nanos() as f64;
            let avg_nanos = prev_nanos + (cur_nanos - prev_nanos) / self.executed as f64;
            Duration::from_nanos(avg_nanos as u64)
        };
    }
}
