use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;
use tracing::info;

use conveyor_core::PipelineConfig;
use conveyor_core::gate::{SubmissionGate, SubmitRequest, SubmitResponse};
use conveyor_core::impls::{FlakyProcessor, InMemoryRecordStore, InMemoryTaskQueue};
use conveyor_core::monitor::DeadLetterMonitor;
use conveyor_core::ports::TaskQueue;
use conveyor_core::worker::{TaskWorker, WorkerGroup};

/// End-to-end demo: submit a batch of tasks against the in-memory stack
/// with a deliberately flaky processor, let the workers and the dead-letter
/// monitor run, then print where everything ended up.
#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let task_count: usize = std::env::args()
        .nth(1)
        .and_then(|arg| arg.parse().ok())
        .unwrap_or(10);

    let config = PipelineConfig::default();
    let store = Arc::new(InMemoryRecordStore::new());
    let queue = Arc::new(InMemoryTaskQueue::new(
        config.max_receive_count,
        config.batch_size,
    ));

    let gate = SubmissionGate::new(store.clone(), queue.clone());
    let worker = Arc::new(TaskWorker::new(
        store.clone(),
        queue.clone(),
        Arc::new(FlakyProcessor::new(0.6)),
        config.backoff_policy(),
    ));
    let workers = WorkerGroup::spawn(config.workers, worker);

    let monitor = Arc::new(DeadLetterMonitor::new(store.clone(), queue.clone()));
    let monitor_handle = DeadLetterMonitor::spawn(monitor.clone());

    for i in 0..task_count {
        let result = gate
            .submit(SubmitRequest {
                task_id: format!("task-{i}"),
                payload: serde_json::json!({ "data": format!("task payload {i}") }),
            })
            .await;
        let response = SubmitResponse::from_result(&result);
        info!(
            status = response.status_code,
            task_id = ?response.task_id,
            "{}",
            response.message
        );
    }

    // Let retries and dead-letter routing drain: the slowest surviving task
    // needs two backoff rounds (2s + 4s) plus redelivery slack.
    sleep(Duration::from_secs(10)).await;

    let depths = queue.depths().await;
    let audits = monitor.audits().await;
    info!(
        pending_records = store.len().await,
        ready = depths.ready,
        delayed = depths.delayed,
        in_flight = depths.in_flight,
        dead_letter = depths.dead_letter,
        dead_lettered_total = audits.len(),
        "run complete"
    );
    for audit in &audits {
        info!(
            task_id = %audit.task_id,
            retry_count = ?audit.retry_count,
            "dead-lettered task"
        );
    }

    monitor_handle.shutdown_and_join().await;
    workers.shutdown_and_join().await;
}
