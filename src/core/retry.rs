//! Bounded retry policy for backend calls.

use crate::{Error, Result};
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Bounded attempts with a fixed backoff and a per-attempt timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, at least one.
    pub max_attempts: u32,
    /// Pause between attempts.
    pub backoff: Duration,
    /// Upper bound for a single attempt.
    pub timeout: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: Duration, timeout: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
            timeout,
        }
    }

    /// Single attempt, no backoff. Used by tests for determinism.
    pub fn none() -> Self {
        Self::new(1, Duration::ZERO, Duration::from_secs(30))
    }

    /// Run `op` until it succeeds, fails with a non-transient error, or the
    /// attempts are exhausted. An attempt exceeding the timeout fails with
    /// [`Error::Timeout`].
    ///
    /// Once `cancel` fires no further attempt starts and the backoff pause is
    /// cut short; the result is [`Error::Cancelled`]. An attempt already in
    /// flight is allowed to finish.
    pub async fn run<T, F, Fut>(&self, what: &str, cancel: &CancellationToken, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 1;
        loop {
            if cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }
            let result = match tokio::time::timeout(self.timeout, op()).await {
                Ok(result) => result,
                Err(_) => Err(Error::Timeout(self.timeout)),
            };

            match result {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt < self.max_attempts => {
                    tracing::debug!(
                        "{} failed (attempt {}/{}): {}",
                        what,
                        attempt,
                        self.max_attempts,
                        e
                    );
                    attempt += 1;
                    if !self.backoff.is_zero() {
                        tokio::select! {
                            _ = cancel.cancelled() => return Err(Error::Cancelled),
                            _ = tokio::time::sleep(self.backoff) => {}
                        }
                    }
                }
                Err(e) => return Err(e),
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(500), Duration::from_secs(60))
    }
}
