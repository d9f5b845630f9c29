//! TaskQueue port: at-least-once delayed delivery plus its dead-letter sink.

use std::time::Duration;

use async_trait::async_trait;
use ulid::Ulid;

use crate::domain::{QueueMessage, TaskId};
use crate::error::PipelineError;
use crate::observability::QueueDepths;

/// Longest delay a transport accepts at enqueue time; larger values are
/// clamped.
pub const MAX_ENQUEUE_DELAY: Duration = Duration::from_secs(900);

/// Abstraction over an at-least-once delayed-delivery transport.
///
/// Delivery contract:
/// - `receive_batch` yields unordered batches; each message stays in-flight
///   until acked or nacked. Duplicates and reorderings are allowed, across
///   task ids and within one.
/// - `nack` makes the message eligible for redelivery; once its receive
///   count has reached the transport's limit it is routed to the dead-letter
///   sink instead.
/// - Delivery happens no earlier than the enqueue delay; nothing more is
///   guaranteed about timing.
#[async_trait]
pub trait TaskQueue: Send + Sync {
    /// Schedule at-least-once delivery no earlier than `delay` from now.
    async fn enqueue(&self, task_id: &TaskId, delay: Duration) -> Result<(), PipelineError>;

    /// Wait for and take the next batch from the main queue.
    async fn receive_batch(&self) -> Vec<QueueMessage>;

    /// Acknowledge a delivery: the message is handled and removed for good.
    async fn ack(&self, message_id: Ulid) -> Result<(), PipelineError>;

    /// Refuse a delivery: redeliver, or dead-letter past the receive limit.
    async fn nack(&self, message_id: Ulid) -> Result<(), PipelineError>;

    /// Wait for and take the next batch from the dead-letter sink. Messages
    /// are consumed on delivery; this is the terminal channel.
    async fn receive_dead_letter_batch(&self) -> Vec<QueueMessage>;

    /// Counts per lane, for status output.
    async fn depths(&self) -> QueueDepths;
}
