//! Randomized settle delays.
//!
//! Pauses are for politeness towards the site; nothing depends on their
//! exact length. A `0..0` range disables them, which is what the tests use.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Uniformly random delay in `[min_ms, max_ms]` milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelayRange {
    pub min_ms: u64,
    pub max_ms: u64,
}

impl DelayRange {
    pub const NONE: DelayRange = DelayRange { min_ms: 0, max_ms: 0 };

    pub const fn from_millis(min_ms: u64, max_ms: u64) -> Self {
        Self { min_ms, max_ms }
    }

    pub const fn from_secs(min: u64, max: u64) -> Self {
        Self::from_millis(min * 1000, max * 1000)
    }

    /// Draw one delay. A reversed range is treated as its swapped form.
    pub fn sample(&self) -> Duration {
        let (lo, hi) = if self.min_ms <= self.max_ms {
            (self.min_ms, self.max_ms)
        } else {
            (self.max_ms, self.min_ms)
        };
        Duration::from_millis(fastrand::u64(lo..=hi))
    }

    pub fn is_zero(&self) -> bool {
        self.min_ms == 0 && self.max_ms == 0
    }

    /// Sleep for a freshly sampled delay.
    pub async fn pause(&self) {
        if self.is_zero() {
            return;
        }
        let delay = self.sample();
        tracing::trace!("Settling for {:?}", delay);
        tokio::time::sleep(delay).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_stays_in_range() {
        let range = DelayRange::from_millis(200, 500);
        for _ in 0..200 {
            let d = range.sample();
            assert!(d >= Duration::from_millis(200) && d <= Duration::from_millis(500));
        }
    }

    #[test]
    fn test_reversed_range() {
        let range = DelayRange::from_millis(50, 10);
        for _ in 0..50 {
            let d = range.sample();
            assert!(d >= Duration::from_millis(10) && d <= Duration::from_millis(50));
        }
    }

    #[test]
    fn test_from_secs() {
        assert_eq!(DelayRange::from_secs(2, 5), DelayRange::from_millis(2000, 5000));
        assert!(DelayRange::NONE.is_zero());
        assert_eq!(DelayRange::NONE.sample(), Duration::ZERO);
    }

    #[tokio::test]
    async fn test_zero_pause_returns_immediately() {
        let start = std::time::Instant::now();
        DelayRange::NONE.pause().await;
        assert!(start.elapsed() < Duration::from_millis(50));
    }
}
