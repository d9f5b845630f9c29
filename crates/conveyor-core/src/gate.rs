//! Submission gate: validation, dedup, persist-then-enqueue.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::domain::TaskId;
use crate::error::PipelineError;
use crate::ports::{CreateOutcome, RecordStore, TaskQueue};

/// A submission as parsed off the wire.
#[derive(Debug, Clone, Deserialize)]
pub struct SubmitRequest {
    pub task_id: String,
    pub payload: serde_json::Value,
}

/// Successful submission receipt.
#[derive(Debug, Clone, Serialize)]
pub struct SubmitReceipt {
    pub task_id: TaskId,
}

/// HTTP-shaped response for the front-door collaborator.
#[derive(Debug, Clone, Serialize)]
pub struct SubmitResponse {
    pub status_code: u16,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_id: Option<TaskId>,
}

impl SubmitResponse {
    /// Map a submit result onto the 200/400/409/500 wire contract.
    pub fn from_result(result: &Result<SubmitReceipt, PipelineError>) -> Self {
        match result {
            Ok(receipt) => Self {
                status_code: 200,
                message: "task submitted".to_string(),
                task_id: Some(receipt.task_id.clone()),
            },
            Err(err) => Self {
                status_code: err.status_code(),
                message: err.to_string(),
                task_id: None,
            },
        }
    }
}

/// Front-door entry point: validate, dedup, persist, enqueue.
pub struct SubmissionGate {
    store: Arc<dyn RecordStore>,
    queue: Arc<dyn TaskQueue>,
}

impl SubmissionGate {
    pub fn new(store: Arc<dyn RecordStore>, queue: Arc<dyn TaskQueue>) -> Self {
        Self { store, queue }
    }

    /// Accept one task submission.
    ///
    /// Ordering matters here: the record is persisted before the message is
    /// enqueued, so a consumer that sees the message can always resolve the
    /// record. The reverse order would turn a crash between the two steps
    /// into a message with no state behind it.
    ///
    /// Resubmitting an id is a `Conflict`, never a silent merge.
    pub async fn submit(&self, request: SubmitRequest) -> Result<SubmitReceipt, PipelineError> {
        let task_id = validate(&request)?;

        match self.store.create_if_absent(&task_id, request.payload).await? {
            CreateOutcome::AlreadyExists => return Err(PipelineError::Conflict(task_id)),
            CreateOutcome::Created => {}
        }

        self.queue.enqueue(&task_id, Duration::ZERO).await?;
        info!(task_id = %task_id, "task submitted");

        Ok(SubmitReceipt { task_id })
    }
}

fn validate(request: &SubmitRequest) -> Result<TaskId, PipelineError> {
    if request.task_id.is_empty() {
        return Err(PipelineError::InvalidRequest(
            "task_id must be a non-empty string".to_string(),
        ));
    }
    if !request.payload.is_object() {
        return Err(PipelineError::InvalidRequest(
            "payload must be a JSON object".to_string(),
        ));
    }
    Ok(TaskId::new(request.task_id.clone()))
}
