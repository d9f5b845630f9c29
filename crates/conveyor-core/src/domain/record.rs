//! Task identity and the durable per-task record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Client-supplied opaque task identifier.
///
/// Uniqueness is the client's claim; the store's create-if-absent is what
/// actually enforces it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskId(String);

impl TaskId {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Durable dedup/retry state for one task.
///
/// Design:
/// - The store row is the single source of truth for retry state; queue
///   messages carry the id only.
/// - `payload` is opaque to the pipeline and immutable once created.
/// - `retry_count` moves only through the store's atomic increment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRecord {
    pub task_id: TaskId,
    pub payload: serde_json::Value,
    pub retry_count: u32,
    pub created_at: DateTime<Utc>,
}

impl TaskRecord {
    pub fn new(task_id: TaskId, payload: serde_json::Value) -> Self {
        Self {
            task_id,
            payload,
            retry_count: 0,
            created_at: Utc::now(),
        }
    }
}
