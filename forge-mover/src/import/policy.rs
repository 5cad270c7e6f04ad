//! Polling schedule for import tracking.

use std::time::Duration;

/// Bounded exponential polling schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportPolicy {
    /// Progress polls before giving up.
    pub max_attempts: u32,
    /// Delay after the first poll; doubles per attempt.
    pub base_delay: Duration,
    /// Upper bound on any single delay.
    pub max_delay: Duration,
}

impl Default for ImportPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(20),
        }
    }
}

impl ImportPolicy {
    /// Delay slept after poll number `attempt` (zero-based): `min(base * 2^attempt, max)`.
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.base_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delays_double_then_cap() {
        let policy = ImportPolicy::default();
        let delays: Vec<u64> = (0..7)
            .map(|n| policy.delay_for_attempt(n).as_secs())
            .collect();
        assert_eq!(delays, vec![1, 2, 4, 8, 16, 20, 20]);
    }

    #[test]
    fn huge_attempt_numbers_do_not_overflow() {
        let policy = ImportPolicy::default();
        assert_eq!(policy.delay_for_attempt(64), Duration::from_secs(20));
        assert_eq!(policy.delay_for_attempt(31), Duration::from_secs(20));
    }
}
