//! Redisplay policy for failed document submissions.

/// Fixed delay before the upload view is shown again.
pub const REDISPLAY_DELAY_MS: u64 = 1_200;

/// Controls automatic redisplay of the upload step after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Failed attempts allowed before giving up; `None` never gives up.
    pub max_attempts: Option<u32>,
    /// Delay after the first failure.
    pub base_delay_ms: u64,
    /// Upper bound for any delay.
    pub max_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: None,
            base_delay_ms: REDISPLAY_DELAY_MS,
            max_delay_ms: REDISPLAY_DELAY_MS,
        }
    }
}

impl RetryPolicy {
    /// Default fixed delay with an attempt cap.
    pub fn capped(max_attempts: u32) -> Self {
        Self {
            max_attempts: Some(max_attempts),
            ..Self::default()
        }
    }

    /// Returns `true` when the upload step may be shown again after
    /// `failed_attempts` consecutive failures.
    pub fn allows_redisplay(&self, failed_attempts: u32) -> bool {
        self.max_attempts
            .is_none_or(|max_attempts| failed_attempts < max_attempts)
    }

    /// Delay before redisplay after the `attempt`-th consecutive failure.
    ///
    /// `min(base * 2^(attempt - 1), max)`.
    pub fn delay_for(&self, attempt: u32) -> u64 {
        let exponent = attempt.saturating_sub(1).min(32);
        self.base_delay_ms
            .saturating_mul(1_u64 << exponent)
            .min(self.max_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for redisplay policy math.

    use super::*;

    #[test]
    fn default_policy_is_fixed_and_unbounded() {
        let policy = RetryPolicy::default();
        for attempt in [1, 2, 10, 1_000] {
            assert!(policy.allows_redisplay(attempt));
            assert_eq!(policy.delay_for(attempt), REDISPLAY_DELAY_MS);
        }
    }

    #[test]
    fn backoff_doubles_up_to_cap() {
        let policy = RetryPolicy {
            max_attempts: Some(3),
            base_delay_ms: 500,
            max_delay_ms: 1_500,
        };
        assert_eq!(policy.delay_for(1), 500);
        assert_eq!(policy.delay_for(2), 1_000);
        assert_eq!(policy.delay_for(3), 1_500);
        assert!(policy.allows_redisplay(2));
        assert!(!policy.allows_redisplay(3));
    }
}
