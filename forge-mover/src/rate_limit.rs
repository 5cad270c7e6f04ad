//! GitHub core rate-limit guard.
//!
//! Write calls against the destination check the remaining core quota first
//! and sleep until the window resets when it runs low.

mod info;

pub use info::RateLimitInfo;

use crate::provider::ProviderError;
use octocrab::Octocrab;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Longest we are willing to sleep for a reset (1 hour).
const MAX_WAIT: Duration = Duration::from_secs(3600);

/// Remaining requests below which we wait for the reset.
const MIN_REMAINING_THRESHOLD: u32 = 10;

const PROVIDER: &str = "GitHub";

/// Fetches the current core quota.
///
/// # Errors
///
/// Returns an error if the rate limit API call fails.
pub async fn check_core_rate_limit(octocrab: &Octocrab) -> Result<RateLimitInfo, octocrab::Error> {
    let rate_limit = octocrab.ratelimit().get().await?;
    let core = &rate_limit.resources.core;

    Ok(RateLimitInfo {
        remaining: core.remaining as u32,
        reset: core.reset,
        limit: core.limit as u32,
    })
}

/// Computes how long to pause before the next write, if at all.
#[must_use]
pub fn required_wait(info: &RateLimitInfo, now: u64) -> Option<Duration> {
    if info.remaining >= MIN_REMAINING_THRESHOLD {
        return None;
    }

    let wait = info.until_reset(now);
    if wait.is_zero() {
        return None;
    }

    if wait > MAX_WAIT {
        warn!(
            wait_secs = wait.as_secs(),
            max_wait_secs = MAX_WAIT.as_secs(),
            "Rate limit reset too far in future, capping wait time"
        );
    }
    Some(wait.min(MAX_WAIT))
}

/// Sleeps until the quota resets when it is nearly exhausted.
///
/// Returns `true` if we waited.
///
/// # Errors
///
/// Returns [`ProviderError::Cancelled`] if `cancel` fires during the wait.
pub async fn wait_if_needed(
    info: &RateLimitInfo,
    cancel: &CancellationToken,
) -> Result<bool, ProviderError> {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();

    let Some(wait) = required_wait(info, now) else {
        return Ok(false);
    };

    info!(
        remaining = info.remaining,
        limit = info.limit,
        wait_secs = wait.as_secs(),
        "Destination rate limit low, waiting for reset"
    );
    tokio::select! {
        () = cancel.cancelled() => {
            warn!("Cancelled while waiting for rate limit reset");
            Err(ProviderError::Cancelled(PROVIDER))
        }
        () = tokio::time::sleep(wait) => Ok(true),
    }
}

/// Ensures sufficient core quota before a write call.
///
/// # Errors
///
/// Returns an error if the rate limit check fails or the wait is cancelled.
pub async fn ensure_core_rate_limit(
    octocrab: &Octocrab,
    cancel: &CancellationToken,
) -> Result<(), ProviderError> {
    let info = check_core_rate_limit(octocrab).await?;
    wait_if_needed(&info, cancel).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_wait_with_plenty_remaining() {
        let info = RateLimitInfo {
            remaining: 4000,
            reset: 2_000,
            limit: 5000,
        };
        assert_eq!(required_wait(&info, 1_000), None);
    }

    #[test]
    fn waits_until_reset_when_low() {
        let info = RateLimitInfo {
            remaining: 2,
            reset: 1_030,
            limit: 5000,
        };
        assert_eq!(required_wait(&info, 1_000), Some(Duration::from_secs(30)));
    }

    #[test]
    fn caps_wait_at_one_hour() {
        let info = RateLimitInfo {
            remaining: 0,
            reset: 100_000,
            limit: 5000,
        };
        assert_eq!(required_wait(&info, 0), Some(MAX_WAIT));
    }

    fn low_quota_resetting_in(secs: u64) -> RateLimitInfo {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs();
        RateLimitInfo {
            remaining: 0,
            reset: now + secs,
            limit: 5000,
        }
    }

    #[tokio::test]
    async fn reset_in_the_past_does_not_wait() {
        let info = RateLimitInfo {
            remaining: 1,
            reset: 0,
            limit: 30,
        };
        assert!(!wait_if_needed(&info, &CancellationToken::new())
            .await
            .unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn waits_for_reset_when_not_cancelled() {
        let info = low_quota_resetting_in(120);
        let start = tokio::time::Instant::now();

        assert!(wait_if_needed(&info, &CancellationToken::new())
            .await
            .unwrap());
        assert!(start.elapsed() >= Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_interrupts_the_wait() {
        let info = low_quota_resetting_in(1800);
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(5)).await;
            trigger.cancel();
        });
        let start = tokio::time::Instant::now();

        let err = wait_if_needed(&info, &cancel).await.unwrap_err();

        assert!(matches!(err, ProviderError::Cancelled(_)));
        assert!(start.elapsed() < Duration::from_secs(60));
    }
}
