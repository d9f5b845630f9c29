//! In-memory task queue with redelivery and dead-letter routing.

use std::collections::{BinaryHeap, HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};
use tokio::time::Instant;
use ulid::Ulid;

use crate::domain::{QueueMessage, TaskId};
use crate::error::PipelineError;
use crate::observability::QueueDepths;
use crate::ports::{MAX_ENQUEUE_DELAY, TaskQueue};

/// A message waiting out its enqueue delay.
///
/// Reverse ordering so `BinaryHeap` acts as a min-heap (earliest first).
#[derive(Debug, Clone, PartialEq, Eq)]
struct DelayedMessage {
    visible_at: Instant,
    message: QueueMessage,
}

impl PartialOrd for DelayedMessage {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DelayedMessage {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        other.visible_at.cmp(&self.visible_at)
    }
}

/// The four lanes a message can sit in.
struct QueueLanes {
    ready: VecDeque<QueueMessage>,
    delayed: BinaryHeap<DelayedMessage>,
    in_flight: HashMap<Ulid, QueueMessage>,
    dead: VecDeque<QueueMessage>,
}

impl QueueLanes {
    fn new() -> Self {
        Self {
            ready: VecDeque::new(),
            delayed: BinaryHeap::new(),
            in_flight: HashMap::new(),
            dead: VecDeque::new(),
        }
    }

    /// Move delayed messages whose time has come into the ready lane.
    fn promote_due(&mut self, now: Instant) {
        while self.delayed.peek().is_some_and(|entry| entry.visible_at <= now) {
            if let Some(entry) = self.delayed.pop() {
                self.ready.push_back(entry.message);
            }
        }
    }
}

/// In-memory transport for development and tests.
///
/// Models the contract the pipeline is written against: at-least-once
/// delivery, per-message receive counts, nack-driven redelivery, and
/// dead-letter routing once the receive limit is reached. A nacked message
/// becomes visible again immediately rather than after a visibility
/// timeout; consumers must already tolerate duplicates, so the tighter
/// schedule only speeds tests up.
pub struct InMemoryTaskQueue {
    lanes: Arc<Mutex<QueueLanes>>,
    max_receive_count: u32,
    batch_size: usize,
    notify: Arc<Notify>,
    dead_notify: Arc<Notify>,
}

impl InMemoryTaskQueue {
    pub fn new(max_receive_count: u32, batch_size: usize) -> Self {
        Self {
            lanes: Arc::new(Mutex::new(QueueLanes::new())),
            max_receive_count,
            batch_size: batch_size.max(1),
            notify: Arc::new(Notify::new()),
            dead_notify: Arc::new(Notify::new()),
        }
    }
}

#[async_trait]
impl TaskQueue for InMemoryTaskQueue {
    async fn enqueue(&self, task_id: &TaskId, delay: Duration) -> Result<(), PipelineError> {
        let delay = delay.min(MAX_ENQUEUE_DELAY);
        let message = QueueMessage::new(task_id.clone());

        {
            let mut lanes = self.lanes.lock().await;
            if delay.is_zero() {
                lanes.ready.push_back(message);
            } else {
                lanes.delayed.push(DelayedMessage {
                    visible_at: Instant::now() + delay,
                    message,
                });
            }
        }

        // Wake a receiver even for delayed messages: it may need to re-arm
        // its timer to an earlier deadline.
        self.notify.notify_one();
        Ok(())
    }

    async fn receive_batch(&self) -> Vec<QueueMessage> {
        loop {
            let next_wake = {
                let mut lanes = self.lanes.lock().await;
                lanes.promote_due(Instant::now());

                if !lanes.ready.is_empty() {
                    let mut batch = Vec::new();
                    while batch.len() < self.batch_size {
                        let Some(mut message) = lanes.ready.pop_front() else {
                            break;
                        };
                        message.receive_count += 1;
                        lanes.in_flight.insert(message.message_id, message.clone());
                        batch.push(message);
                    }
                    return batch;
                }

                // Nothing ready; maybe a delayed message fixes that later.
                lanes.delayed.peek().map(|entry| entry.visible_at)
            };

            // Wait for a new message OR the next delayed deadline.
            if let Some(wake_at) = next_wake {
                tokio::select! {
                    _ = self.notify.notified() => {}
                    _ = tokio::time::sleep_until(wake_at) => {}
                }
            } else {
                self.notify.notified().await;
            }
        }
    }

    async fn ack(&self, message_id: Ulid) -> Result<(), PipelineError> {
        // Unknown receipts are ignored: an ack is allowed to race a
        // duplicate delivery of the same message.
        self.lanes.lock().await.in_flight.remove(&message_id);
        Ok(())
    }

    async fn nack(&self, message_id: Ulid) -> Result<(), PipelineError> {
        let dead_lettered = {
            let mut lanes = self.lanes.lock().await;
            let Some(message) = lanes.in_flight.remove(&message_id) else {
                return Ok(());
            };

            if message.receive_count >= self.max_receive_count {
                lanes.dead.push_back(message);
                true
            } else {
                lanes.ready.push_back(message);
                false
            }
        };

        if dead_lettered {
            self.dead_notify.notify_one();
        } else {
            self.notify.notify_one();
        }
        Ok(())
    }

    async fn receive_dead_letter_batch(&self) -> Vec<QueueMessage> {
        loop {
            {
                let mut lanes = self.lanes.lock().await;
                if !lanes.dead.is_empty() {
                    let take = lanes.dead.len().min(self.batch_size);
                    return lanes.dead.drain(..take).collect();
                }
            }
            self.dead_notify.notified().await;
        }
    }

    async fn depths(&self) -> QueueDepths {
        let lanes = self.lanes.lock().await;
        QueueDepths {
            ready: lanes.ready.len(),
            delayed: lanes.delayed.len(),
            in_flight: lanes.in_flight.len(),
            dead_letter: lanes.dead.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> TaskId {
        TaskId::new(s)
    }

    #[tokio::test]
    async fn immediate_enqueue_is_delivered() {
        let queue = InMemoryTaskQueue::new(3, 10);
        queue.enqueue(&id("t1"), Duration::ZERO).await.unwrap();

        let batch = queue.receive_batch().await;
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].task_id, id("t1"));
        assert_eq!(batch[0].receive_count, 1);

        let depths = queue.depths().await;
        assert_eq!(depths.in_flight, 1);
        assert_eq!(depths.ready, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn delayed_message_waits_for_its_deadline() {
        let queue = InMemoryTaskQueue::new(3, 10);
        let before = Instant::now();
        queue
            .enqueue(&id("t1"), Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(queue.depths().await.delayed, 1);

        let batch = queue.receive_batch().await;
        assert_eq!(batch.len(), 1);
        assert!(before.elapsed() >= Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn oversized_delay_is_clamped_to_the_transport_maximum() {
        let queue = InMemoryTaskQueue::new(3, 10);
        let before = Instant::now();
        queue
            .enqueue(&id("t1"), Duration::from_secs(100_000))
            .await
            .unwrap();

        let batch = queue.receive_batch().await;
        assert_eq!(batch.len(), 1);
        assert_eq!(before.elapsed(), MAX_ENQUEUE_DELAY);
    }

    #[tokio::test]
    async fn ack_removes_the_message_for_good() {
        let queue = InMemoryTaskQueue::new(3, 10);
        queue.enqueue(&id("t1"), Duration::ZERO).await.unwrap();

        let batch = queue.receive_batch().await;
        queue.ack(batch[0].message_id).await.unwrap();

        assert_eq!(queue.depths().await, QueueDepths::default());
    }

    #[tokio::test]
    async fn nack_redelivers_with_a_higher_receive_count() {
        let queue = InMemoryTaskQueue::new(3, 10);
        queue.enqueue(&id("t1"), Duration::ZERO).await.unwrap();

        let first = queue.receive_batch().await;
        queue.nack(first[0].message_id).await.unwrap();

        let second = queue.receive_batch().await;
        assert_eq!(second[0].message_id, first[0].message_id);
        assert_eq!(second[0].receive_count, 2);
    }

    #[tokio::test]
    async fn nack_past_the_receive_limit_routes_to_the_dead_letter_lane() {
        let queue = InMemoryTaskQueue::new(2, 10);
        queue.enqueue(&id("t1"), Duration::ZERO).await.unwrap();

        let first = queue.receive_batch().await;
        queue.nack(first[0].message_id).await.unwrap();
        let second = queue.receive_batch().await;
        queue.nack(second[0].message_id).await.unwrap();

        assert_eq!(queue.depths().await.dead_letter, 1);
        let dead = queue.receive_dead_letter_batch().await;
        assert_eq!(dead.len(), 1);
        assert_eq!(dead[0].task_id, id("t1"));
        assert_eq!(dead[0].receive_count, 2);

        // Consumed on delivery.
        assert_eq!(queue.depths().await, QueueDepths::default());
    }

    #[tokio::test]
    async fn batches_are_bounded() {
        let queue = InMemoryTaskQueue::new(3, 4);
        for i in 0..10 {
            queue
                .enqueue(&id(&format!("t{i}")), Duration::ZERO)
                .await
                .unwrap();
        }

        let batch = queue.receive_batch().await;
        assert_eq!(batch.len(), 4);
        assert_eq!(queue.depths().await.ready, 6);
    }

    #[tokio::test]
    async fn enqueue_wakes_a_waiting_receiver() {
        let queue = Arc::new(InMemoryTaskQueue::new(3, 10));

        let receiver = tokio::spawn({
            let queue = Arc::clone(&queue);
            async move { queue.receive_batch().await }
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        queue.enqueue(&id("t1"), Duration::ZERO).await.unwrap();

        let batch = receiver.await.unwrap();
        assert_eq!(batch[0].task_id, id("t1"));
    }
}
