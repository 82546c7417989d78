use std::time::Duration;

/// Decision returned by the retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Give up and surface the last error.
    NoRetry,
    /// Try again after the given delay.
    RetryAfter(Duration),
}

/// Attempt budget with a fixed delay between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the first). Never below 1.
    pub max_attempts: u32,
    /// Pause between two consecutive attempts.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            delay: Duration::from_millis(1500),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    /// `attempt` is 1-based (1 = first attempt, which just failed).
    pub fn decide(&self, attempt: u32) -> RetryDecision {
        if attempt >= self.max_attempts {
            RetryDecision::NoRetry
        } else {
            RetryDecision::RetryAfter(self.delay)
        }
    }
}
