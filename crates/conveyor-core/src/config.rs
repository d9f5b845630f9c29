//! Pipeline configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::BackoffPolicy;

/// Tunables for the whole pipeline.
///
/// Defaults match the reference deployment: 2 retries (3 attempts total),
/// 60s backoff cap, 3 deliveries before dead-lettering, batches of 10.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Retries allowed after the first attempt.
    pub max_retries: u32,

    /// Upper bound on a single backoff delay, in seconds.
    pub backoff_cap_secs: u64,

    /// Transport deliveries of one message before it is dead-lettered.
    pub max_receive_count: u32,

    /// Messages per delivered batch.
    pub batch_size: usize,

    /// Concurrent workers to spawn.
    pub workers: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            backoff_cap_secs: 60,
            max_receive_count: 3,
            batch_size: 10,
            workers: 2,
        }
    }
}

impl PipelineConfig {
    /// Backoff policy derived from this config.
    pub fn backoff_policy(&self) -> BackoffPolicy {
        BackoffPolicy::new(self.max_retries, Duration::from_secs(self.backoff_cap_secs))
    }
}
