//! Wall-clock throughput sampling.
//!
//! Rates are computed over fixed wall-clock windows rather than per chunk, so
//! bursty network frames do not produce noisy numbers.

use std::time::{Duration, Instant};

/// Computes bytes/second over windows of at least `interval`.
#[derive(Debug, Clone)]
pub struct ThroughputSampler {
    interval: Duration,
    last_instant: Instant,
    last_bytes: u64,
}

impl ThroughputSampler {
    /// Starts a sampler whose first window opens at `start` with zero bytes.
    #[must_use]
    pub fn new(interval: Duration, start: Instant) -> Self {
        Self {
            interval,
            last_instant: start,
            last_bytes: 0,
        }
    }

    /// Returns a new rate once `interval` has elapsed since the last sample.
    ///
    /// `bytes_total` is the cumulative byte count. The window restarts at
    /// `now` whenever a rate is returned.
    pub fn sample(&mut self, now: Instant, bytes_total: u64) -> Option<f64> {
        let elapsed = now.saturating_duration_since(self.last_instant);
        if elapsed < self.interval || elapsed.is_zero() {
            return None;
        }
        let delta = bytes_total.saturating_sub(self.last_bytes);
        #[allow(clippy::cast_precision_loss)]
        let rate = delta as f64 / elapsed.as_secs_f64();
        self.last_instant = now;
        self.last_bytes = bytes_total;
        Some(rate)
    }
}
