//! Bounded retry with exponential backoff and jitter for trigger calls.
//!
//! Only errors classified as retryable by [`TriggerError::is_retryable`]
//! are retried; everything else propagates on the first attempt. This is
//! the only retry behavior in the crate and sits strictly beneath the
//! build/deploy trigger layer.

use super::TriggerError;
use rand::Rng;
use std::future::Future;
use std::time::Duration;

/// Configuration for trigger-call retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryConfig {
    /// Maximum attempts, including the initial call.
    pub max_attempts: usize,
    /// Base delay before the first retry, in milliseconds.
    pub base_delay_ms: u64,
    /// Cap applied to every computed delay, in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1000,
            max_delay_ms: 30_000,
        }
    }
}

impl RetryConfig {
    /// Creates the default config.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum attempt count.
    #[must_use]
    pub fn with_max_attempts(mut self, attempts: usize) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Sets the base delay.
    #[must_use]
    pub fn with_base_delay_ms(mut self, delay: u64) -> Self {
        self.base_delay_ms = delay;
        self
    }

    /// Sets the delay cap.
    #[must_use]
    pub fn with_max_delay_ms(mut self, delay: u64) -> Self {
        self.max_delay_ms = delay;
        self
    }

    /// Delay before retry number `retry` (1-based), with full jitter.
    #[must_use]
    pub fn delay_for(&self, retry: usize) -> Duration {
        let exponent = u32::try_from(retry.saturating_sub(1)).unwrap_or(u32::MAX);
        let raw = self
            .base_delay_ms
            .saturating_mul(2u64.saturating_pow(exponent))
            .min(self.max_delay_ms);
        let jittered = if raw == 0 {
            0
        } else {
            rand::thread_rng().gen_range(0..=raw)
        };
        Duration::from_millis(jittered)
    }
}

/// Runs `operation`, retrying retryable [`TriggerError`]s with capped
/// exponential backoff plus random jitter.
///
/// `key` only labels log lines; it carries no semantics.
pub async fn with_retry<T, F, Fut>(
    config: &RetryConfig,
    key: &str,
    mut operation: F,
) -> Result<T, TriggerError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, TriggerError>>,
{
    let mut attempt = 1;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(error) => {
                if !error.is_retryable() {
                    tracing::debug!(key, attempt, error = %error, "error is not retryable");
                    return Err(error);
                }
                if attempt >= config.max_attempts {
                    tracing::warn!(key, attempt, error = %error, "retries exhausted");
                    return Err(error);
                }
                let delay = config.delay_for(attempt);
                tracing::debug!(
                    key,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %error,
                    "retrying after transient error"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn fast_config(max_attempts: usize) -> RetryConfig {
        RetryConfig::new()
            .with_max_attempts(max_attempts)
            .with_base_delay_ms(1)
            .with_max_delay_ms(2)
    }

    #[test]
    fn delay_grows_and_caps() {
        let config = RetryConfig::new()
            .with_base_delay_ms(100)
            .with_max_delay_ms(500);

        // Jitter picks within [0, raw]; raw itself must grow then cap.
        for _ in 0..20 {
            assert!(config.delay_for(1) <= Duration::from_millis(100));
            assert!(config.delay_for(2) <= Duration::from_millis(200));
            assert!(config.delay_for(4) <= Duration::from_millis(500));
            assert!(config.delay_for(40) <= Duration::from_millis(500));
        }
    }

    #[tokio::test]
    async fn first_try_success_calls_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();

        let result = with_retry(&fast_config(3), "test", || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok::<_, TriggerError>(7)
            }
        })
        .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retryable_error_is_retried_until_success() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();

        let result = with_retry(&fast_config(5), "test", || {
            let counter = counter.clone();
            async move {
                let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
                if n < 3 {
                    Err(TriggerError::new("throttled").with_code("ThrottlingException"))
                } else {
                    Ok(n)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn non_retryable_error_propagates_on_first_attempt() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();

        let result: Result<(), TriggerError> = with_retry(&fast_config(5), "test", || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(TriggerError::new("invalid build spec").with_status(400))
            }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_are_bounded_by_max_attempts() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();

        let result: Result<(), TriggerError> = with_retry(&fast_config(3), "test", || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(TriggerError::new("gateway timeout").with_status(504))
            }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
