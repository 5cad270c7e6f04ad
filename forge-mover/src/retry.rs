//! Retry helper for rate-limited provider reads.

use std::future::Future;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use backon::{ExponentialBuilder, Retryable};

use crate::provider::ProviderError;

/// Configuration for retry operations.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Minimum delay between retries.
    pub min_delay: Duration,
    /// Maximum delay between retries.
    pub max_delay: Duration,
    /// Maximum number of retry attempts.
    pub max_retries: usize,
    /// Whether to add jitter to delays.
    pub with_jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            min_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            max_retries: 5,
            with_jitter: true,
        }
    }
}

impl RetryConfig {
    /// Builds an exponential backoff strategy from this configuration.
    #[must_use]
    pub fn into_backoff(self) -> ExponentialBuilder {
        let mut builder = ExponentialBuilder::default()
            .with_min_delay(self.min_delay)
            .with_max_delay(self.max_delay)
            .with_max_times(self.max_retries);

        if self.with_jitter {
            builder = builder.with_jitter();
        }

        builder
    }
}

/// Default backoff for provider reads: 1s doubling up to 60s, 5 retries, jittered.
#[must_use]
pub fn default_backoff() -> ExponentialBuilder {
    RetryConfig::default().into_backoff()
}

/// Runs `operation`, retrying while it fails with a rate-limit error.
///
/// Any other error is returned immediately.
pub async fn with_retry<T, F, Fut>(operation: F, endpoint: &str) -> Result<T, ProviderError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ProviderError>>,
{
    with_retry_config(operation, endpoint, default_backoff()).await
}

/// [`with_retry`] with an explicit backoff strategy.
pub async fn with_retry_config<T, F, Fut>(
    mut operation: F,
    endpoint: &str,
    backoff: ExponentialBuilder,
) -> Result<T, ProviderError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ProviderError>>,
{
    let attempt = AtomicU32::new(0);

    let retry_op = || {
        attempt.fetch_add(1, Ordering::SeqCst);
        operation()
    };

    retry_op
        .retry(backoff)
        .notify(|err: &ProviderError, dur: Duration| {
            tracing::debug!(
                endpoint,
                attempt = attempt.load(Ordering::SeqCst),
                retry_in_ms = dur.as_millis() as u64,
                error = %err,
                "Rate limited, backing off"
            );
        })
        .when(ProviderError::is_rate_limited)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn default_config_values() {
        let config = RetryConfig::default();
        assert_eq!(config.min_delay, Duration::from_secs(1));
        assert_eq!(config.max_delay, Duration::from_secs(60));
        assert_eq!(config.max_retries, 5);
        assert!(config.with_jitter);
    }

    #[tokio::test(start_paused = true)]
    async fn retries_rate_limited_calls_until_success() {
        let calls = Arc::new(AtomicU32::new(0));
        let calls_capture = Arc::clone(&calls);

        let result = with_retry(
            move || {
                let calls_capture = Arc::clone(&calls_capture);
                async move {
                    if calls_capture.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err(ProviderError::RateLimited {
                            provider: "GitLab",
                            endpoint: "projects".to_string(),
                        })
                    } else {
                        Ok(7)
                    }
                }
            },
            "projects",
        )
        .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn other_errors_are_not_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let calls_capture = Arc::clone(&calls);

        let result: Result<(), _> = with_retry(
            move || {
                let calls_capture = Arc::clone(&calls_capture);
                async move {
                    calls_capture.fetch_add(1, Ordering::SeqCst);
                    Err(ProviderError::api("boom"))
                }
            },
            "projects",
        )
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
