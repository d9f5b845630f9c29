//! Backoff policy: the pure retry/exhaustion decision.

use std::time::Duration;

/// What to do with a task that just failed an attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackoffDecision {
    /// Schedule one more delivery after `delay`.
    Retry { delay: Duration },

    /// Retry budget spent; the message belongs on the dead-letter path.
    Exhausted,
}

/// Exponential backoff with a cap, plus the retry budget.
///
/// Pure and deterministic: whether an attempt failed is the processor's
/// concern, this only maps the new retry count to a decision.
#[derive(Debug, Clone)]
pub struct BackoffPolicy {
    /// Retries allowed after the first attempt (so `max_retries + 1`
    /// attempts total).
    pub max_retries: u32,

    /// Upper bound on any single delay.
    pub cap: Duration,
}

impl BackoffPolicy {
    pub fn new(max_retries: u32, cap: Duration) -> Self {
        Self { max_retries, cap }
    }

    /// Decide after a failed attempt.
    ///
    /// `new_retry_count` is the count AFTER the store increment; the delay
    /// grows as `2^new_retry_count` seconds, clamped to `cap`:
    /// - retry 1: 2s
    /// - retry 2: 4s
    /// - retry 6: 60s (capped at the default)
    pub fn decide(&self, new_retry_count: u32) -> BackoffDecision {
        if new_retry_count > self.max_retries {
            return BackoffDecision::Exhausted;
        }

        let delay = 2u64
            .checked_pow(new_retry_count)
            .map(Duration::from_secs)
            .unwrap_or(self.cap)
            .min(self.cap);
        BackoffDecision::Retry { delay }
    }
}

impl Default for BackoffPolicy {
    /// Reference values: 2 retries (3 attempts total), 60s cap.
    fn default() -> Self {
        Self {
            max_retries: 2,
            cap: Duration::from_secs(60),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(1, 2)]
    #[case(2, 4)]
    #[case(3, 8)]
    #[case(5, 32)]
    #[case(6, 60)] // 64 clamped to the cap
    #[case(20, 60)]
    fn delay_doubles_until_the_cap(#[case] new_retry_count: u32, #[case] expect_secs: u64) {
        let policy = BackoffPolicy::new(30, Duration::from_secs(60));
        assert_eq!(
            policy.decide(new_retry_count),
            BackoffDecision::Retry {
                delay: Duration::from_secs(expect_secs)
            }
        );
    }

    #[test]
    fn within_budget_retries_past_budget_exhausts() {
        let policy = BackoffPolicy::default();

        assert!(matches!(policy.decide(1), BackoffDecision::Retry { .. }));
        assert!(matches!(policy.decide(2), BackoffDecision::Retry { .. }));
        assert_eq!(policy.decide(3), BackoffDecision::Exhausted);
    }

    #[test]
    fn huge_counts_do_not_overflow() {
        let policy = BackoffPolicy::new(u32::MAX, Duration::from_secs(60));
        assert_eq!(
            policy.decide(u32::MAX - 1),
            BackoffDecision::Retry {
                delay: Duration::from_secs(60)
            }
        );
    }
}
