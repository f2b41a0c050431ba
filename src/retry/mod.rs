//! Retry with exponential backoff
//!
//! This module provides:
//! - `RetryPolicy`: attempt count, base delay and growth factor
//! - `retry`: drives a fallible async operation under a policy
//! - `Sleeper`: the injectable suspension capability used for every wait
//!
//! No jitter is applied. The walker never issues concurrent requests, so there
//! is no herd to spread out.

mod sleeper;

pub use sleeper::{sleep_or_cancel, until_cancelled, Sleeper, TokioSleeper};

use crate::config::RetryConfig;
use crate::WalkerError;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Exponential backoff policy
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one (at least 1)
    pub attempts: u32,
    /// Delay after the first failed attempt
    pub base_delay: Duration,
    /// Multiplier applied per failed attempt
    pub factor: f64,
}

impl RetryPolicy {
    pub fn new(attempts: u32, base_delay: Duration, factor: f64) -> Self {
        Self {
            attempts: attempts.max(1),
            base_delay,
            factor,
        }
    }

    /// Delay to wait after the failed attempt with zero-based index `attempt`
    ///
    /// `base_delay * factor^attempt`, so the first retry waits exactly `base_delay`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let millis = self.base_delay.as_millis() as f64 * self.factor.powi(exponent);
        Duration::from_millis(millis.round() as u64)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self::new(
            config.attempts,
            Duration::from_millis(config.base_delay_ms),
            config.factor,
        )
    }
}

/// Runs `operation` until it succeeds or the policy is exhausted
///
/// The operation receives the zero-based attempt index. Errors for which
/// [`WalkerError::is_retryable`] is false are returned immediately. When every
/// attempt fails, the last error is returned. There is no sleep after the
/// final attempt.
///
/// # Arguments
///
/// * `policy` - Attempt count and backoff parameters
/// * `sleeper` - Where the backoff delays are spent
/// * `cancel` - Aborts a pending backoff delay with `WalkerError::Cancelled`
/// * `operation` - The fallible operation to run
pub async fn retry<T, F, Fut>(
    policy: &RetryPolicy,
    sleeper: &dyn Sleeper,
    cancel: &CancellationToken,
    mut operation: F,
) -> Result<T, WalkerError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, WalkerError>>,
{
    let mut attempt = 0;
    loop {
        match operation(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) if !e.is_retryable() => return Err(e),
            Err(e) => {
                if attempt + 1 >= policy.attempts {
                    tracing::warn!(
                        "Attempt {}/{} failed: {}. Giving up",
                        attempt + 1,
                        policy.attempts,
                        e
                    );
                    return Err(e);
                }

                let delay = policy.delay_for(attempt);
                tracing::warn!(
                    "Attempt {}/{} failed: {}. Retrying in {}ms",
                    attempt + 1,
                    policy.attempts,
                    e,
                    delay.as_millis()
                );
                sleep_or_cancel(sleeper, delay, cancel).await?;
                attempt += 1;
            }
        }
    }
}
