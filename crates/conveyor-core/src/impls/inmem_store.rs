//! In-memory record store.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{TaskId, TaskRecord};
use crate::error::PipelineError;
use crate::ports::{CreateOutcome, RecordStore};

/// HashMap-backed store for development and tests.
///
/// One mutex around the map makes each trait method a single critical
/// section, which is exactly the per-key atomicity the contract asks for.
#[derive(Default)]
pub struct InMemoryRecordStore {
    records: Mutex<HashMap<TaskId, TaskRecord>>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live records, for status output.
    pub async fn len(&self) -> usize {
        self.records.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.lock().await.is_empty()
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn get(&self, task_id: &TaskId) -> Result<Option<TaskRecord>, PipelineError> {
        Ok(self.records.lock().await.get(task_id).cloned())
    }

    async fn create_if_absent(
        &self,
        task_id: &TaskId,
        payload: serde_json::Value,
    ) -> Result<CreateOutcome, PipelineError> {
        let mut records = self.records.lock().await;
        if records.contains_key(task_id) {
            return Ok(CreateOutcome::AlreadyExists);
        }
        records.insert(task_id.clone(), TaskRecord::new(task_id.clone(), payload));
        Ok(CreateOutcome::Created)
    }

    async fn increment_retry(&self, task_id: &TaskId) -> Result<u32, PipelineError> {
        let mut records = self.records.lock().await;
        let record = records
            .get_mut(task_id)
            .ok_or_else(|| PipelineError::NotFound(task_id.clone()))?;
        record.retry_count += 1;
        Ok(record.retry_count)
    }

    async fn delete(&self, task_id: &TaskId) -> Result<(), PipelineError> {
        self.records.lock().await.remove(task_id);
        Ok(())
    }
}
