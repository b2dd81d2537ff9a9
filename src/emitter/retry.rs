//! Delivery retry policy

use std::time::Duration;

/// What to do with a response status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Delivered,
    /// 429 or 5xx: try again after backoff
    Retry,
    /// Any other 4xx: give up immediately
    Terminal,
}

/// Bounded exponential backoff
///
/// Attempt `n` (0-based) that fails is followed by a wait of
/// `min(base * 2^n, max)` before attempt `n + 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    base: Duration,
    max: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(1000), Duration::from_millis(10_000))
    }
}

impl RetryPolicy {
    /// `max_attempts` counts every attempt including the first; at least 1
    pub fn new(max_attempts: u32, base: Duration, max: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base,
            max,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Wait after failed attempt `attempt` (0-based)
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
        self.base
            .checked_mul(factor)
            .map_or(self.max, |d| d.min(self.max))
    }

    /// Whether another attempt follows attempt `attempt` (0-based)
    pub fn has_next(&self, attempt: u32) -> bool {
        attempt + 1 < self.max_attempts
    }

    pub fn classify(status: u16) -> Disposition {
        match status {
            200..=299 => Disposition::Delivered,
            429 => Disposition::Retry,
            400..=499 => Disposition::Terminal,
            _ => Disposition::Retry,
        }
    }
}
