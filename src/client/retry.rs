//! Retry Policy Module

use std::time::Duration;

use crate::error::RequestError;

// == Retry Policy ==
/// Linear backoff: the n-th retry waits `base_delay * n`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
        }
    }

    /// No retries at all.
    pub fn none() -> Self {
        Self::new(0, Duration::ZERO)
    }

    /// Whether to try again after `attempt` (1-based) failed with `error`.
    pub fn should_retry(&self, error: &RequestError, attempt: u32, eligible: bool) -> bool {
        eligible && error.is_retryable() && attempt <= self.max_retries
    }

    /// Wait before the attempt following `attempt`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(attempt)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(1000))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_budget_allows_max_retries_plus_one_attempts() {
        let policy = RetryPolicy::new(2, Duration::from_millis(10));
        let transient = RequestError::Network("reset".into());

        assert!(policy.should_retry(&transient, 1, true));
        assert!(policy.should_retry(&transient, 2, true));
        assert!(!policy.should_retry(&transient, 3, true));
    }

    #[test]
    fn test_terminal_or_ineligible_not_retried() {
        let policy = RetryPolicy::default();
        assert!(!policy.should_retry(&RequestError::NotFound("p".into()), 1, true));
        assert!(!policy.should_retry(&RequestError::Network("x".into()), 1, false));
        assert!(!RetryPolicy::none().should_retry(&RequestError::Network("x".into()), 1, true));
    }

    #[test]
    fn test_delay_grows_linearly() {
        let policy = RetryPolicy::new(3, Duration::from_millis(250));
        assert_eq!(policy.delay_for(1), Duration::from_millis(250));
        assert_eq!(policy.delay_for(2), Duration::from_millis(500));
        assert_eq!(policy.delay_for(3), Duration::from_millis(750));
    }
}
