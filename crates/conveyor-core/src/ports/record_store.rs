//! RecordStore port: durable dedup/retry state, one row per task id.

use async_trait::async_trait;

use crate::domain::{TaskId, TaskRecord};
use crate::error::PipelineError;

/// Result of a create-if-absent attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateOutcome {
    Created,
    AlreadyExists,
}

/// Capability interface over any atomic key-value engine.
///
/// Design:
/// - Every operation is atomic at single-key granularity; that is the only
///   concurrency guarantee the pipeline relies on. Concurrent duplicate
///   processing then degrades to redundant work, never corrupted state.
/// - No general `put`/`update`: callers can create, bump the retry counter,
///   or delete, nothing else.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Fetch the record, or `None` if the task is unknown or finalized.
    async fn get(&self, task_id: &TaskId) -> Result<Option<TaskRecord>, PipelineError>;

    /// Atomic check-and-create. Concurrent submissions of the same id must
    /// not both observe `Created`.
    async fn create_if_absent(
        &self,
        task_id: &TaskId,
        payload: serde_json::Value,
    ) -> Result<CreateOutcome, PipelineError>;

    /// Atomic increment; returns the new count. `NotFound` means the record
    /// is gone: the task raced with a success or dead-letter cleanup.
    async fn increment_retry(&self, task_id: &TaskId) -> Result<u32, PipelineError>;

    /// Idempotent delete; removing an absent key is not an error.
    async fn delete(&self, task_id: &TaskId) -> Result<(), PipelineError>;
}
