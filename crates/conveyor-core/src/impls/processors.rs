//! Stock processors: a random-failure stand-in and a scripted one for tests.

use std::collections::VecDeque;

use async_trait::async_trait;
use rand::Rng;
use tokio::sync::Mutex;

use crate::domain::TaskRecord;
use crate::ports::{ProcessOutcome, TaskProcessor};

/// Fails a configurable fraction of attempts at random.
///
/// Stand-in for real business logic in demos and load drivers. Nothing in
/// the pipeline depends on the randomness; swap in any other
/// `TaskProcessor` for real work.
pub struct FlakyProcessor {
    failure_rate: f64,
}

impl FlakyProcessor {
    pub fn new(failure_rate: f64) -> Self {
        Self {
            failure_rate: failure_rate.clamp(0.0, 1.0),
        }
    }
}

#[async_trait]
impl TaskProcessor for FlakyProcessor {
    async fn process(&self, record: &TaskRecord) -> ProcessOutcome {
        if rand::thread_rng().gen_bool(self.failure_rate) {
            ProcessOutcome::failure(format!("simulated failure for task {}", record.task_id))
        } else {
            ProcessOutcome::Success
        }
    }
}

/// Replays a fixed sequence of outcomes, then succeeds forever.
///
/// Deterministic replacement for `FlakyProcessor` in tests.
pub struct ScriptedProcessor {
    script: Mutex<VecDeque<ProcessOutcome>>,
}

impl ScriptedProcessor {
    pub fn new(outcomes: impl IntoIterator<Item = ProcessOutcome>) -> Self {
        Self {
            script: Mutex::new(outcomes.into_iter().collect()),
        }
    }

    /// `n` failures, then success forever.
    pub fn failing_times(n: usize) -> Self {
        Self::new((0..n).map(|i| ProcessOutcome::failure(format!("scripted failure {}", i + 1))))
    }
}

#[async_trait]
impl TaskProcessor for ScriptedProcessor {
    async fn process(&self, _record: &TaskRecord) -> ProcessOutcome {
        self.script
            .lock()
            .await
            .pop_front()
            .unwrap_or(ProcessOutcome::Success)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TaskId;

    fn record() -> TaskRecord {
        TaskRecord::new(TaskId::new("t1"), serde_json::json!({}))
    }

    #[tokio::test]
    async fn scripted_outcomes_replay_in_order_then_succeed() {
        let processor = ScriptedProcessor::failing_times(2);

        assert!(matches!(
            processor.process(&record()).await,
            ProcessOutcome::Failure { .. }
        ));
        assert!(matches!(
            processor.process(&record()).await,
            ProcessOutcome::Failure { .. }
        ));
        assert_eq!(processor.process(&record()).await, ProcessOutcome::Success);
        assert_eq!(processor.process(&record()).await, ProcessOutcome::Success);
    }

    #[tokio::test]
    async fn flaky_extremes_are_deterministic() {
        let always = FlakyProcessor::new(1.0);
        let never = FlakyProcessor::new(0.0);

        assert!(matches!(
            always.process(&record()).await,
            ProcessOutcome::Failure { .. }
        ));
        assert_eq!(never.process(&record()).await, ProcessOutcome::Success);
    }
}
