//! Ordering, merging, timeout and flush behaviour through the public API.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use serialq_queue::{Awareness, QueueConfig, TaskId, TaskInfo, TaskOptions, TaskQueue};

type Log = Arc<Mutex<Vec<String>>>;

fn new_queue() -> TaskQueue {
    TaskQueue::new(QueueConfig::default().with_name("integration")).unwrap()
}

fn recorder(log: &Log, entry: &str) -> impl FnOnce(&Awareness) -> anyhow::Result<()> + Send + 'static {
    let log = log.clone();
    let entry = entry.to_string();
    move |_: &Awareness| {
        log.lock().unwrap().push(entry);
        Ok(())
    }
}

fn entries(log: &Log) -> Vec<String> {
    log.lock().unwrap().clone()
}

async fn flush_within(queue: &TaskQueue, limit: Duration) {
    tokio::time::timeout(limit, queue.flush())
        .await
        .expect("flush did not finish in time");
}

#[tokio::test]
async fn fifo_order_without_keys() {
    let queue = new_queue();
    let log = Log::default();

    queue.submit_sync(TaskOptions::new(), recorder(&log, "a"));
    queue.submit_sync(TaskOptions::new(), recorder(&log, "b"));
    queue.submit_sync(TaskOptions::new(), recorder(&log, "c"));
    flush_within(&queue, Duration::from_secs(1)).await;

    assert_eq!(entries(&log), ["a", "b", "c"]);
}

#[tokio::test]
async fn debounce_merge_runs_only_the_newest() {
    let queue = new_queue();
    let log = Log::default();
    let seen: Arc<Mutex<Vec<TaskInfo>>> = Arc::default();

    let first = queue.submit_sync(
        TaskOptions::new().key("K").delay(Duration::from_millis(100)),
        recorder(&log, "task1"),
    );
    let (l, s) = (log.clone(), seen.clone());
    queue.submit_sync(
        TaskOptions::new().key("K").delay(Duration::from_millis(100)),
        move |aware| {
            l.lock().unwrap().push("task2".into());
            s.lock().unwrap().extend(aware.merged_tasks().iter().cloned());
            Ok(())
        },
    );

    tokio::time::timeout(Duration::from_secs(1), async {
        while entries(&log).is_empty() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("debounced task never ran");
    flush_within(&queue, Duration::from_secs(1)).await;

    assert_eq!(entries(&log), ["task2"]);
    let merged = seen.lock().unwrap().clone();
    assert_eq!(merged.len(), 1);
    assert_eq!(merged[0].id, first);
}

#[tokio::test]
async fn chained_merge_keeps_provenance_in_order() {
    let queue = new_queue();
    let log = Log::default();
    let merged_ids: Arc<Mutex<Vec<TaskId>>> = Arc::default();

    let first = queue.submit_sync(TaskOptions::new().key("K").delay(Duration::from_millis(50)), recorder(&log, "first"));
    let second = queue.submit_sync(TaskOptions::new().key("K").delay(Duration::from_millis(50)), recorder(&log, "second"));
    let (l, m) = (log.clone(), merged_ids.clone());
    queue.submit_sync(TaskOptions::new().key("K").delay(Duration::from_millis(50)), move |aware| {
        l.lock().unwrap().push("third".into());
        m.lock().unwrap().extend(aware.merged_tasks().iter().map(|t| t.id));
        Ok(())
    });
    assert_eq!(queue.pending_len(), 1);

    flush_within(&queue, Duration::from_secs(1)).await;

    assert_eq!(entries(&log), ["third"]);
    assert_eq!(*merged_ids.lock().unwrap(), vec![first, second]);
    assert_eq!(queue.metrics().merged, 2);
}

#[tokio::test]
async fn recursive_submission_runs_before_queued_work() {
    let queue = new_queue();
    let log = Log::default();

    let (q, l) = (queue.clone(), log.clone());
    queue.submit_sync(TaskOptions::new(), move |_| {
        l.lock().unwrap().push("task1".into());
        q.submit_sync(TaskOptions::new(), recorder(&l, "task2"));
        Ok(())
    });
    queue.submit_sync(TaskOptions::new(), recorder(&log, "task3"));
    flush_within(&queue, Duration::from_secs(1)).await;

    assert_eq!(entries(&log), ["task1", "task2", "task3"]);
}

#[tokio::test]
async fn hung_task_does_not_block_the_queue() {
    let queue = new_queue();
    let started = Instant::now();
    let next_ran_at: Arc<Mutex<Option<Duration>>> = Arc::default();

    queue.submit_async(TaskOptions::new().timeout(Duration::from_millis(50)), |_| async {
        std::future::pending::<()>().await;
        Ok(())
    });
    let at = next_ran_at.clone();
    queue.submit_sync(TaskOptions::new(), move |_| {
        *at.lock().unwrap() = Some(started.elapsed());
        Ok(())
    });
    flush_within(&queue, Duration::from_secs(2)).await;

    let elapsed = next_ran_at.lock().unwrap().expect("next task never ran");
    assert!(elapsed >= Duration::from_millis(50));
    assert!(elapsed < Duration::from_millis(1000), "next task waited {elapsed:?}");
    assert_eq!(queue.metrics().timed_out, 1);
}

#[tokio::test]
async fn flush_forces_delayed_task() {
    let queue = new_queue();
    let log = Log::default();
    let started = Instant::now();

    queue.submit_sync(TaskOptions::new().delay(Duration::from_millis(1000)), recorder(&log, "delayed"));
    flush_within(&queue, Duration::from_millis(900)).await;

    assert_eq!(entries(&log), ["delayed"]);
    assert!(started.elapsed() < Duration::from_millis(1000));
}

#[tokio::test]
async fn false_condition_skips_only_that_task() {
    let queue = new_queue();
    let log = Log::default();

    queue.submit_sync(TaskOptions::new().condition(|| false), recorder(&log, "skipped"));
    queue.submit_sync(TaskOptions::new(), recorder(&log, "next"));
    flush_within(&queue, Duration::from_secs(1)).await;

    assert_eq!(entries(&log), ["next"]);
    assert_eq!(queue.metrics().skipped, 1);
}

#[tokio::test]
async fn flush_on_idle_queue_returns_immediately() {
    let queue = new_queue();
    assert!(queue.is_idle());

    flush_within(&queue, Duration::from_millis(100)).await;

    let metrics = queue.metrics();
    assert_eq!(metrics.submitted, 0);
    assert_eq!(metrics.executed, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_submitters_never_overlap() {
    let queue = new_queue();
    let running = Arc::new(AtomicUsize::new(0));
    let overlaps = Arc::new(AtomicUsize::new(0));
    let done = Arc::new(AtomicUsize::new(0));

    let mut handles = Vec::new();
    for _ in 0..4 {
        let (queue, running, overlaps, done) = (queue.clone(), running.clone(), overlaps.clone(), done.clone());
        handles.push(tokio::spawn(async move {
            for _ in 0..25 {
                let (running, overlaps, done) = (running.clone(), overlaps.clone(), done.clone());
                queue.submit_async(TaskOptions::new(), move |_| async move {
                    if running.fetch_add(1, Ordering::SeqCst) > 0 {
                        overlaps.fetch_add(1, Ordering::SeqCst);
                    }
                    tokio::task::yield_now().await;
                    running.fetch_sub(1, Ordering::SeqCst);
                    done.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                });
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }
    flush_within(&queue, Duration::from_secs(5)).await;

    assert_eq!(done.load(Ordering::SeqCst), 100);
    assert_eq!(overlaps.load(Ordering::SeqCst), 0);
}
