use thiserror::Error;

use crate::domain::TaskId;

/// Error taxonomy for the pipeline.
///
/// `NotFound` is recovered locally by the worker (skip-and-log); it only
/// surfaces as an `Err` from the store itself. `RetriesExhausted` exists for
/// boundaries that need the terminal failure as an error value; inside the
/// core the same fact travels as `worker::Disposition::Exhausted`.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("task {0} already submitted")]
    Conflict(TaskId),

    #[error("task {0} not found in store")]
    NotFound(TaskId),

    #[error("task {task_id} processing failed: {reason}")]
    ProcessingFailure { task_id: TaskId, reason: String },

    #[error("task {task_id} failed after {retry_count} retries")]
    RetriesExhausted { task_id: TaskId, retry_count: u32 },

    #[error("store error: {0}")]
    Store(String),

    #[error("queue error: {0}")]
    Queue(String),
}

impl PipelineError {
    /// HTTP-equivalent status code at the submission boundary.
    pub fn status_code(&self) -> u16 {
        match self {
            PipelineError::InvalidRequest(_) => 400,
            PipelineError::Conflict(_) => 409,
            _ => 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_the_taxonomy() {
        let task_id = TaskId::new("t1");

        assert_eq!(PipelineError::InvalidRequest("bad".into()).status_code(), 400);
        assert_eq!(PipelineError::Conflict(task_id.clone()).status_code(), 409);
        assert_eq!(PipelineError::NotFound(task_id.clone()).status_code(), 500);
        assert_eq!(
            PipelineError::ProcessingFailure {
                task_id: task_id.clone(),
                reason: "boom".into(),
            }
            .status_code(),
            500
        );
        assert_eq!(
            PipelineError::RetriesExhausted {
                task_id,
                retry_count: 3,
            }
            .status_code(),
            500
        );
    }

    #[test]
    fn messages_name_the_task() {
        let err = PipelineError::Conflict(TaskId::new("t1"));
        assert_eq!(err.to_string(), "task t1 already submitted");
    }
}
