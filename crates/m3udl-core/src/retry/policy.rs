use std::time::Duration;

use super::classify::ErrorKind;

/// Decision returned by the retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Do not retry; the last failure is final.
    NoRetry,
    /// Retry after the given delay.
    RetryAfter(Duration),
}

/// Fixed-delay retry policy applied after the main pass.
///
/// Retries run one at a time, each preceded by `delay`, for at most
/// `max_retries` attempts beyond the initial try.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Decide whether a task that has already been retried `retries_done`
    /// times gets another attempt after failing with `kind`.
    pub fn decide(&self, retries_done: u32, kind: ErrorKind) -> RetryDecision {
        if kind == ErrorKind::Cancelled || retries_done >= self.max_retries {
            return RetryDecision::NoRetry;
        }
        RetryDecision::RetryAfter(self.delay)
    }

    /// True when attempt `attempt` (0 = initial try) is the last one permitted.
    pub fn is_final_attempt(&self, attempt: u32) -> bool {
        attempt >= self.max_retries
    }
}
