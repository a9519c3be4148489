//! Bounded retry with exponential backoff for idempotent calls.
//!
//! Applied uniformly to read-only network calls (quotes, balances, market
//! data) and to rate-limited notification sends. Never used around
//! transaction submission.

use crate::domain::errors::TradeError;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(500),
        }
    }
}

/// Run `op` until it succeeds, fails non-retryably, or attempts run out.
/// Delay doubles between attempts.
pub async fn with_backoff<T, F, Fut>(
    policy: &RetryPolicy,
    what: &str,
    mut op: F,
) -> Result<T, TradeError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, TradeError>>,
{
    let mut delay = policy.initial_delay;
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(v) => return Ok(v),
            Err(e) if e.is_retryable() && attempt < policy.max_attempts => {
                warn!(call = what, attempt, error = %e, "retryable failure, backing off");
                tokio::time::sleep(delay).await;
                delay *= 2;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
