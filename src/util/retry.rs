//! Bounded retry with exponential backoff for remote calls.

use crate::trace::trace_warn;
use crate::util::{TileMatchError, TileMatchResult};
use std::future::Future;
use std::time::Duration;

/// Retry policy shared by metadata, history and tile requests.
///
/// Only errors for which [`TileMatchError::is_transient`] holds are retried;
/// anything else is returned on the first occurrence.
#[derive(Clone, Debug, PartialEq)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first one.
    pub max_attempts: u32,
    /// Delay before the second attempt; doubled for every further attempt.
    pub base_backoff: Duration,
    /// Upper bound for a single delay.
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            base_backoff: Duration::from_secs(5),
            max_backoff: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    /// A policy that retries without sleeping, mostly useful in tests.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
        }
    }

    /// Delay to wait after the given failed attempt (1-based).
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(16);
        self.base_backoff
            .saturating_mul(1u32 << shift)
            .min(self.max_backoff)
    }

    /// Runs `op` until it succeeds, fails permanently, or exhausts the attempts.
    ///
    /// `what` labels the operation in logs and in the final error.
    pub async fn run<T, F, Fut>(&self, what: &str, mut op: F) -> TileMatchResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = TileMatchResult<T>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_transient() => {
                    if attempt >= max_attempts {
                        return Err(TileMatchError::RetriesExhausted {
                            what: what.to_owned(),
                            attempts: attempt,
                            reason: err.to_string(),
                        });
                    }
                    let delay = self.backoff_for(attempt);
                    trace_warn!(
                        "retrying",
                        what = what,
                        attempt = attempt,
                        error = %err,
                        delay_ms = delay.as_millis() as u64
                    );
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                }
                Err(err) => return Err(err),
            }
        }
    }
}
