//! Suspension points shared by the retry driver and the pollers
//!
//! All waiting goes through a [`Sleeper`] so tests can observe the exact
//! delays without spending wall-clock time.

use crate::WalkerError;
use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Capability to suspend the current task for a duration
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Sleeper backed by the tokio timer
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Sleeps for `duration` unless the token is cancelled first
///
/// # Returns
///
/// * `Ok(())` - The full duration elapsed
/// * `Err(WalkerError::Cancelled)` - The token fired before the sleep ended
pub async fn sleep_or_cancel(
    sleeper: &dyn Sleeper,
    duration: Duration,
    cancel: &CancellationToken,
) -> Result<(), WalkerError> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(WalkerError::Cancelled),
        _ = sleeper.sleep(duration) => Ok(()),
    }
}

/// Awaits `fut` unless the token is cancelled first
pub async fn until_cancelled<T, F>(cancel: &CancellationToken, fut: F) -> Result<T, WalkerError>
where
    F: Future<Output = Result<T, WalkerError>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(WalkerError::Cancelled),
        result = fut => result,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_sleep_completes_without_cancel() {
        let cancel = CancellationToken::new();
        let result = sleep_or_cancel(&TokioSleeper, Duration::from_millis(1), &cancel).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_sleep_aborts_on_cancel() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = sleep_or_cancel(&TokioSleeper, Duration::from_secs(3600), &cancel).await;
        assert!(matches!(result, Err(WalkerError::Cancelled)));
    }

    #[tokio::test]
    async fn test_until_cancelled_passes_result_through() {
        let cancel = CancellationToken::new();
        let result = until_cancelled(&cancel, async { Ok::<_, WalkerError>(7) }).await;
        assert_eq!(result.unwrap(), 7);
    }
}
