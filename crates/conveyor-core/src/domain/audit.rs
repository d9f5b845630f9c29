//! Dead-letter audit record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::TaskId;

/// Terminal audit entry for a task whose message reached the dead-letter
/// sink.
///
/// `payload` and `retry_count` are `None` when the record was already
/// cleaned up by an earlier duplicate delivery; "unknown" is an expected
/// answer here, not an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeadLetterAudit {
    pub task_id: TaskId,
    pub payload: Option<serde_json::Value>,
    pub retry_count: Option<u32>,
    pub dead_lettered_at: DateTime<Utc>,
}
