//! Task worker: consume deliveries and apply the retry state machine.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::domain::{BackoffDecision, BackoffPolicy, QueueMessage};
use crate::error::PipelineError;
use crate::ports::{ProcessOutcome, RecordStore, TaskProcessor, TaskQueue};

/// What to do with a delivered message after handling it.
///
/// `Exhausted` is a data-flow decision, not a thrown error: the run loop
/// translates it into a negative acknowledgment so the transport's own
/// redelivery and dead-letter routing take over. Everything else
/// acknowledges the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Handled,
    Exhausted,
}

/// Applies one queue message to the per-task state machine.
///
/// Concurrency: several workers may handle duplicates of the same task id
/// at once. Every store call is single-key atomic, so the worst a duplicate
/// can do is redundant work (e.g. a double increment exhausts a task one
/// attempt early, which at-least-once semantics already permit).
pub struct TaskWorker {
    store: Arc<dyn RecordStore>,
    queue: Arc<dyn TaskQueue>,
    processor: Arc<dyn TaskProcessor>,
    backoff: BackoffPolicy,
}

impl TaskWorker {
    pub fn new(
        store: Arc<dyn RecordStore>,
        queue: Arc<dyn TaskQueue>,
        processor: Arc<dyn TaskProcessor>,
        backoff: BackoffPolicy,
    ) -> Self {
        Self {
            store,
            queue,
            processor,
            backoff,
        }
    }

    /// Handle a single delivery.
    ///
    /// A message whose record is gone means the task already succeeded or
    /// was dead-lettered; it is skipped without touching anything, however
    /// many times the transport redelivers it.
    pub async fn handle_message(
        &self,
        message: &QueueMessage,
    ) -> Result<Disposition, PipelineError> {
        let task_id = &message.task_id;

        let Some(record) = self.store.get(task_id).await? else {
            warn!(task_id = %task_id, "task not in store, skipping");
            return Ok(Disposition::Handled);
        };

        match self.processor.process(&record).await {
            ProcessOutcome::Success => {
                self.store.delete(task_id).await?;
                info!(task_id = %task_id, "task processed");
                Ok(Disposition::Handled)
            }
            ProcessOutcome::Failure { reason } => {
                let new_retry_count = match self.store.increment_retry(task_id).await {
                    Ok(count) => count,
                    Err(PipelineError::NotFound(_)) => {
                        // Raced with a success or dead-letter cleanup.
                        warn!(task_id = %task_id, "task not in store, skipping");
                        return Ok(Disposition::Handled);
                    }
                    Err(err) => return Err(err),
                };

                match self.backoff.decide(new_retry_count) {
                    BackoffDecision::Retry { delay } => {
                        self.queue.enqueue(task_id, delay).await?;
                        warn!(
                            task_id = %task_id,
                            retry_count = new_retry_count,
                            delay_secs = delay.as_secs(),
                            reason = %reason,
                            "task requeued with backoff"
                        );
                        Ok(Disposition::Handled)
                    }
                    BackoffDecision::Exhausted => {
                        // The record stays in the store on purpose: the
                        // dead-letter monitor still needs payload and count
                        // for the audit trail.
                        error!(
                            task_id = %task_id,
                            retry_count = new_retry_count,
                            reason = %reason,
                            "max retries exceeded"
                        );
                        Ok(Disposition::Exhausted)
                    }
                }
            }
        }
    }
}

/// Worker pool handle.
///
/// Dropping this does not stop the pool; call `shutdown_and_join`.
pub struct WorkerGroup {
    shutdown_tx: watch::Sender<bool>,
    joins: Vec<JoinHandle<()>>,
}

impl WorkerGroup {
    /// Spawn `n` consumers over the worker's queue.
    pub fn spawn(n: usize, worker: Arc<TaskWorker>) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let mut joins = Vec::with_capacity(n);
        for worker_id in 0..n {
            let w = Arc::clone(&worker);
            let mut rx = shutdown_rx.clone();
            joins.push(tokio::spawn(async move {
                consume_loop(worker_id, w, &mut rx).await;
            }));
        }

        Self { shutdown_tx, joins }
    }

    /// Request shutdown: stop taking new batches. In-flight handling is not
    /// cancelled.
    pub fn request_shutdown(&self) {
        // ignore send error: receivers may already be dropped
        let _ = self.shutdown_tx.send(true);
    }

    /// Shutdown and wait for all workers.
    pub async fn shutdown_and_join(self) {
        self.request_shutdown();
        for join in self.joins {
            let _ = join.await;
        }
    }
}

async fn consume_loop(
    worker_id: usize,
    worker: Arc<TaskWorker>,
    shutdown_rx: &mut watch::Receiver<bool>,
) {
    loop {
        if *shutdown_rx.borrow() {
            break;
        }

        let batch = tokio::select! {
            _ = shutdown_rx.changed() => continue,
            batch = worker.queue.receive_batch() => batch,
        };

        // Messages in a batch are independent; one exhaustion must not
        // poison the acknowledgment of its neighbors.
        for message in batch {
            match worker.handle_message(&message).await {
                Ok(Disposition::Handled) => {
                    if let Err(err) = worker.queue.ack(message.message_id).await {
                        error!(worker_id, message_id = %message.message_id, "ack failed: {err}");
                    }
                }
                Ok(Disposition::Exhausted) => {
                    if let Err(err) = worker.queue.nack(message.message_id).await {
                        error!(worker_id, message_id = %message.message_id, "nack failed: {err}");
                    }
                }
                Err(err) => {
                    error!(worker_id, task_id = %message.task_id, "handling failed: {err}");
                    if let Err(err) = worker.queue.nack(message.message_id).await {
                        error!(worker_id, message_id = %message.message_id, "nack failed: {err}");
                    }
                }
            }
        }
    }
}
