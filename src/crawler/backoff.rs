//! Retry pauses and politeness delays

use rand::Rng;
use std::ops::RangeInclusive;
use std::time::Duration;

/// Pause schedule between transport-level retries
///
/// The n-th pause (0-based) is `base × 2^n`, capped at `cap`, plus a random
/// extra of up to `jitter_percent` percent of that value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetrySchedule {
    base: Duration,
    cap: Duration,
    jitter_percent: u8,
}

impl RetrySchedule {
    pub fn new(base: Duration, cap: Duration) -> Self {
        Self {
            base,
            cap,
            jitter_percent: 0,
        }
    }

    /// Adds up to `percent` percent of random spread to every pause
    /// (clamped to 100)
    pub fn jittered(self, percent: u8) -> Self {
        Self {
            jitter_percent: percent.min(100),
            ..self
        }
    }

    /// Pause without jitter after the `retry`-th failure
    pub fn nominal(&self, retry: u32) -> Duration {
        let factor = 1u32.checked_shl(retry.min(20)).unwrap_or(u32::MAX);
        self.base.saturating_mul(factor).min(self.cap)
    }

    /// Pause after the `retry`-th failure (0-based)
    pub fn pause(&self, retry: u32) -> Duration {
        let nominal = self.nominal(retry);
        if self.jitter_percent == 0 || nominal.is_zero() {
            return nominal;
        }

        let spread_ms = nominal.as_millis() as u64 * u64::from(self.jitter_percent) / 100;
        nominal + Duration::from_millis(rand::thread_rng().gen_range(0..=spread_ms))
    }
}

/// A delay drawn uniformly from `range_ms`
pub fn politeness_delay(range_ms: RangeInclusive<u64>) -> Duration {
    if range_ms.start() >= range_ms.end() {
        return Duration::from_millis(*range_ms.start());
    }
    Duration::from_millis(rand::thread_rng().gen_range(range_ms))
}
