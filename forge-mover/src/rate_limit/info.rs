//! Rate limit snapshot.

use std::time::Duration;

/// Core API quota as reported by GitHub.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitInfo {
    /// Requests remaining in the current window.
    pub remaining: u32,

    /// Unix timestamp when the window resets.
    pub reset: u64,

    /// Total requests allowed per window.
    pub limit: u32,
}

impl RateLimitInfo {
    /// Time left until the window resets, measured from `now` (unix seconds).
    #[must_use]
    pub fn until_reset(&self, now: u64) -> Duration {
        Duration::from_secs(self.reset.saturating_sub(now))
    }
}
