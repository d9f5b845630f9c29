//! Queue message: what travels on the transport.

use serde::{Deserialize, Serialize};
use ulid::Ulid;

use super::TaskId;

/// A message on the task queue.
///
/// Carries the task id only; the record store is the source of truth for
/// payload and retry count. `message_id` doubles as the receipt handle for
/// ack/nack, and `receive_count` is maintained by the transport: it counts
/// deliveries (not retries) and drives dead-letter routing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueMessage {
    pub message_id: Ulid,
    pub task_id: TaskId,
    pub receive_count: u32,
}

impl QueueMessage {
    pub fn new(task_id: TaskId) -> Self {
        Self {
            message_id: Ulid::new(),
            task_id,
            receive_count: 0,
        }
    }
}
