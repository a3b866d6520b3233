//! Retry decisions for failed fetches

use crate::SentinelError;
use std::time::Duration;

/// Decides whether a failed fetch is attempted again
///
/// `attempt` is the number of attempts already made (1 after the first
/// failure). Returning `None` makes the failure terminal.
pub trait RetryPolicy: Send + Sync {
    fn retry_after(&self, attempt: u32, error: &SentinelError) -> Option<Duration>;
}

/// Every failure is terminal
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRetry;

impl RetryPolicy for NoRetry {
    fn retry_after(&self, _attempt: u32, _error: &SentinelError) -> Option<Duration> {
        None
    }
}

/// Retries transport failures a fixed number of times with a constant delay
#[derive(Debug, Clone, Copy)]
pub struct FixedRetry {
    /// Total attempts including the first
    pub max_attempts: u32,
    pub delay: Duration,
}

impl RetryPolicy for FixedRetry {
    fn retry_after(&self, attempt: u32, error: &SentinelError) -> Option<Duration> {
        let transient = matches!(
            error,
            SentinelError::Timeout { .. } | SentinelError::Fetch { .. }
        );
        (transient && attempt < self.max_attempts).then_some(self.delay)
    }
}
