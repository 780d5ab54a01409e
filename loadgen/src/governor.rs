//! Attempt pacing
//!
//! Converts a connections-per-second target into the minimum time one dial
//! attempt must take before the next one may start. It paces attempt starts
//! only: an attempt that already took longer than the interval gets no pause,
//! so cheap dials checked one at a time can still overshoot the nominal rate.

use std::time::Duration;

/// Minimum per-attempt interval derived from the configured rate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateGovernor {
    min_interval: Option<Duration>,
}

impl RateGovernor {
    /// Build a governor for `rate` connections per second, 0 means unconstrained
    pub fn new(rate: u32) -> Self {
        let min_interval = (rate > 0).then(|| Duration::from_secs(1) / rate);
        Self { min_interval }
    }

    pub fn unconstrained() -> Self {
        Self { min_interval: None }
    }

    /// `None` when unconstrained
    pub fn min_interval_per_attempt(&self) -> Option<Duration> {
        self.min_interval
    }

    /// Pause still owed after an attempt that took `elapsed`
    pub fn pause_after(&self, elapsed: Duration) -> Option<Duration> {
        let interval = self.min_interval?;
        (elapsed < interval).then(|| interval - elapsed)
    }

    /// Sleep for whatever remains of the interval after an attempt that took `elapsed`
    pub async fn pace(&self, elapsed: Duration) {
        if let Some(pause) = self.pause_after(elapsed) {
            tokio::time::sleep(pause).await;
        }
    }
}
