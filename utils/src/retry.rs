use getset::{CopyGetters, Getters};
use std::time::Duration;

/// Fixed number of retries with exponential backoff between attempts.
#[derive(Debug, Clone, Getters, CopyGetters)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    #[getset(get_copy = "pub")]
    retries: u32,
    #[getset(get = "pub")]
    base_delay: Duration,
    #[getset(get = "pub")]
    max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: 3,
            base_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(4),
        }
    }
}

impl RetryPolicy {
    pub fn new(retries: u32, base_delay: Duration) -> Self {
        Self {
            retries,
            base_delay,
            ..Default::default()
        }
    }

    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    pub fn none() -> Self {
        Self::new(0, Duration::ZERO)
    }

    /// Total number of attempts, including the first one.
    pub fn attempts(&self) -> u32 {
        self.retries.saturating_add(1)
    }

    /// Delay to wait before retry number `retry` (1-based): base * 2^(retry-1), capped.
    pub fn backoff(&self, retry: u32) -> Duration {
        if retry == 0 {
            return Duration::ZERO;
        }
        let factor = 1u32.checked_shl(retry - 1).unwrap_or(u32::MAX);
        self.base_delay
            .checked_mul(factor)
            .map_or(self.max_delay, |delay| delay.min(self.max_delay))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles_until_cap() {
        let policy = RetryPolicy::new(5, Duration::from_millis(100)).with_max_delay(Duration::from_millis(500));

        assert_eq!(policy.backoff(0), Duration::ZERO);
        assert_eq!(policy.backoff(1), Duration::from_millis(100));
        assert_eq!(policy.backoff(2), Duration::from_millis(200));
        assert_eq!(policy.backoff(3), Duration::from_millis(400));
        assert_eq!(policy.backoff(4), Duration::from_millis(500));
        assert_eq!(policy.backoff(40), Duration::from_millis(500));
    }

    #[test]
    fn test_attempts_include_first_try() {
        assert_eq!(RetryPolicy::default().attempts(), 4);
        assert_eq!(RetryPolicy::none().attempts(), 1);
    }
}
