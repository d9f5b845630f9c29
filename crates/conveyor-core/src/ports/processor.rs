//! TaskProcessor port: the opaque business outcome function.

use async_trait::async_trait;

use crate::domain::TaskRecord;

/// Outcome of one processing attempt.
///
/// Failure here is an expected outcome the retry machinery feeds on, not an
/// error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessOutcome {
    Success,
    Failure { reason: String },
}

impl ProcessOutcome {
    pub fn failure(reason: impl Into<String>) -> Self {
        Self::Failure {
            reason: reason.into(),
        }
    }
}

/// One attempt at the actual business work for a task.
///
/// The pipeline treats this as a black box: it never interprets the payload
/// and never retries inside an attempt. Retry, backoff and dead-lettering
/// all happen around it.
#[async_trait]
pub trait TaskProcessor: Send + Sync {
    async fn process(&self, record: &TaskRecord) -> ProcessOutcome;
}
