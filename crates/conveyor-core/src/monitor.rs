//! Dead-letter monitor: terminal cleanup and the audit trail.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tracing::{error, warn};

use crate::domain::{DeadLetterAudit, QueueMessage};
use crate::error::PipelineError;
use crate::ports::{RecordStore, TaskQueue};

/// Consumes the dead-letter sink: deletes the leftover record and emits an
/// audit entry. Nothing is ever retried from here.
pub struct DeadLetterMonitor {
    store: Arc<dyn RecordStore>,
    queue: Arc<dyn TaskQueue>,
    audits: Mutex<Vec<DeadLetterAudit>>,
}

impl DeadLetterMonitor {
    pub fn new(store: Arc<dyn RecordStore>, queue: Arc<dyn TaskQueue>) -> Self {
        Self {
            store,
            queue,
            audits: Mutex::new(Vec::new()),
        }
    }

    /// Handle one dead-lettered message.
    ///
    /// The record may already be gone (a duplicate dead-letter delivery
    /// raced us), in which case payload and retry count are audited as
    /// unknown rather than treated as an error.
    pub async fn handle_message(
        &self,
        message: &QueueMessage,
    ) -> Result<DeadLetterAudit, PipelineError> {
        let record = self.store.get(&message.task_id).await?;
        if record.is_some() {
            self.store.delete(&message.task_id).await?;
        }

        let audit = DeadLetterAudit {
            task_id: message.task_id.clone(),
            payload: record.as_ref().map(|r| r.payload.clone()),
            retry_count: record.as_ref().map(|r| r.retry_count),
            dead_lettered_at: Utc::now(),
        };

        let payload_text = audit
            .payload
            .as_ref()
            .map_or_else(|| "null".to_string(), |p| p.to_string());
        let retry_text = audit
            .retry_count
            .map_or_else(|| "unknown".to_string(), |c| c.to_string());
        warn!(
            task_id = %audit.task_id,
            payload = %payload_text,
            retry_count = %retry_text,
            "task dead-lettered"
        );

        self.audits.lock().await.push(audit.clone());
        Ok(audit)
    }

    /// Audit entries collected so far.
    pub async fn audits(&self) -> Vec<DeadLetterAudit> {
        self.audits.lock().await.clone()
    }

    /// Spawn the monitor loop, with the same shutdown shape as the workers.
    pub fn spawn(monitor: Arc<Self>) -> MonitorHandle {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

        let join = tokio::spawn(async move {
            loop {
                if *shutdown_rx.borrow() {
                    break;
                }

                let batch = tokio::select! {
                    _ = shutdown_rx.changed() => continue,
                    batch = monitor.queue.receive_dead_letter_batch() => batch,
                };

                for message in batch {
                    if let Err(err) = monitor.handle_message(&message).await {
                        error!(task_id = %message.task_id, "dead-letter handling failed: {err}");
                    }
                }
            }
        });

        MonitorHandle { shutdown_tx, join }
    }
}

/// Handle for the spawned monitor loop.
pub struct MonitorHandle {
    shutdown_tx: watch::Sender<bool>,
    join: JoinHandle<()>,
}

impl MonitorHandle {
    pub fn request_shutdown(&self) {
        // ignore send error: receiver may already be dropped
        let _ = self.shutdown_tx.send(true);
    }

    pub async fn shutdown_and_join(self) {
        self.request_shutdown();
        let _ = self.join.await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::domain::TaskId;
    use crate::impls::{InMemoryRecordStore, InMemoryTaskQueue};

    fn monitor() -> (Arc<InMemoryRecordStore>, DeadLetterMonitor) {
        let store = Arc::new(InMemoryRecordStore::new());
        let queue = Arc::new(InMemoryTaskQueue::new(3, 10));
        let monitor = DeadLetterMonitor::new(store.clone(), queue);
        (store, monitor)
    }

    #[tokio::test]
    async fn finalizes_the_record_and_audits_its_last_state() {
        let (store, monitor) = monitor();
        let task_id = TaskId::new("t1");
        store
            .create_if_absent(&task_id, serde_json::json!({"data": "x"}))
            .await
            .unwrap();
        store.increment_retry(&task_id).await.unwrap();
        store.increment_retry(&task_id).await.unwrap();
        store.increment_retry(&task_id).await.unwrap();

        let audit = monitor
            .handle_message(&QueueMessage::new(task_id.clone()))
            .await
            .unwrap();

        assert_eq!(audit.payload, Some(serde_json::json!({"data": "x"})));
        assert_eq!(audit.retry_count, Some(3));
        assert!(store.get(&task_id).await.unwrap().is_none());
        assert_eq!(monitor.audits().await.len(), 1);
    }

    #[tokio::test]
    async fn tolerates_an_already_finalized_record() {
        let (store, monitor) = monitor();

        let audit = monitor
            .handle_message(&QueueMessage::new(TaskId::new("gone")))
            .await
            .unwrap();

        assert_eq!(audit.payload, None);
        assert_eq!(audit.retry_count, None);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn duplicate_dead_letter_deliveries_audit_the_second_as_unknown() {
        let (store, monitor) = monitor();
        let task_id = TaskId::new("t1");
        store
            .create_if_absent(&task_id, serde_json::json!({}))
            .await
            .unwrap();

        let first = monitor
            .handle_message(&QueueMessage::new(task_id.clone()))
            .await
            .unwrap();
        let second = monitor
            .handle_message(&QueueMessage::new(task_id.clone()))
            .await
            .unwrap();

        assert!(first.payload.is_some());
        assert_eq!(second.payload, None);
        assert_eq!(second.retry_count, None);
        assert_eq!(monitor.audits().await.len(), 2);
    }
}
