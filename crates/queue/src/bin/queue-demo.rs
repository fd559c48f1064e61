//! queue-demo: drives a task queue over an in-memory document.
//!
//! Fires a burst of edits, each paired with a debounced keyed "save", lets
//! one save trigger a recursive re-index, submits a task that never finishes
//! (bounded by its timeout), then flushes and prints the outcome as JSON.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use tracing::info;

use serialq_core::config::load_dotenv;
use serialq_core::Config;
use serialq_queue::{QueueConfig, TaskOptions, TaskQueue};

// ── CLI ─────────────────────────────────────────────────────────────

/// Serial task queue demo: debounced saves over an in-memory document.
#[derive(Parser, Debug)]
#[command(name = "queue-demo", version, about)]
struct Cli {
    /// Path to a queue TOML config file. Falls back to environment config.
    #[arg(long, env = "SERIALQ_CONFIG")]
    config: Option<String>,

    /// Number of edits to submit.
    #[arg(long, default_value_t = 5)]
    edits: usize,

    /// Debounce delay for saves in milliseconds.
    #[arg(long, default_value_t = 200)]
    debounce_ms: u64,

    /// Timeout for the task that never completes, in milliseconds.
    #[arg(long, default_value_t = 300)]
    timeout_ms: u64,
}

// ── Document store ──────────────────────────────────────────────────

#[derive(Debug, Default, Serialize)]
struct Document {
    content: String,
    saves: u64,
    saved_content: Option<String>,
    /// Edits folded into each save.
    save_batches: Vec<usize>,
    index_runs: u64,
}

type Store = Arc<Mutex<Document>>;

fn with_doc<R>(store: &Store, f: impl FnOnce(&mut Document) -> R) -> R {
    let mut doc = store.lock().unwrap_or_else(PoisonError::into_inner);
    f(&mut doc)
}

// ── Main ────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    load_dotenv();
    let env_config = Config::from_env().context("invalid environment configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&env_config.logging.filter)),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();
    env_config.log_summary();

    let config: QueueConfig = match cli.config.as_deref() {
        Some(path) => QueueConfig::from_file(path)
            .with_context(|| format!("failed to load queue config from {path}"))?,
        None => env_config.queue.clone(),
    };

    let queue = TaskQueue::new(config).context("failed to create task queue")?;
    let store: Store = Arc::new(Mutex::new(Document::default()));
    let debounce = Duration::from_millis(cli.debounce_ms);

    info!(edits = cli.edits, debounce_ms = cli.debounce_ms, "submitting edits");
    for i in 0..cli.edits {
        let s = store.clone();
        queue.submit_sync(TaskOptions::new(), move |_| {
            with_doc(&s, |doc| doc.content.push_str(&format!("edit-{i};")));
            Ok(())
        });

        let (s, q) = (store.clone(), queue.clone());
        queue.submit_sync(
            TaskOptions::new().key("save").delay(debounce),
            move |aware| {
                let folded = aware.merged_tasks().len() + 1;
                let first_save = with_doc(&s, |doc| {
                    doc.saves += 1;
                    doc.saved_content = Some(doc.content.clone());
                    doc.save_batches.push(folded);
                    doc.saves == 1
                });
                info!(task_id = %aware.task().id, folded, "document saved");

                if first_save {
                    let s = s.clone();
                    q.submit_sync(TaskOptions::new(), move |aware| {
                        with_doc(&s, |doc| doc.index_runs += 1);
                        info!(task_id = %aware.task().id, recursive = aware.task().recursive, "index rebuilt");
                        Ok(())
                    });
                }
                Ok(())
            },
        );
    }

    queue.submit_async(
        TaskOptions::new()
            .timeout(Duration::from_millis(cli.timeout_ms))
            .metadata(serde_json::json!({ "kind": "stuck-upload" })),
        |_| async move {
            std::future::pending::<()>().await;
            Ok(())
        },
    );

    queue.flush().await;

    let report = serde_json::json!({
        "document": with_doc(&store, |doc| serde_json::to_value(&*doc))?,
        "metrics": queue.metrics(),
        "config": queue.config(),
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
