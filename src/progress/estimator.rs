//! Transfer rate and remaining time estimation.
//!
//! The [`RateEstimator`] keeps a short sliding window of
//! `(bytes so far, elapsed)` samples. The rate is measured across that window
//! only, so it follows slowdowns instead of averaging over the whole
//! transfer.
//!
//! # Examples
//!
//! ```rust
//! use std::time::Duration;
//! use trawl::progress::RateEstimator;
//!
//! let mut estimator = RateEstimator::new(Duration::from_secs(3));
//! estimator.record(0, Duration::ZERO);
//! estimator.record(1_000, Duration::from_secs(1));
//! assert_eq!(estimator.rate(), Some(1_000.0));
//! assert_eq!(estimator.remaining_secs(5_000), Some(4));
//! ```

use std::collections::VecDeque;
use std::time::Duration;

/// Default span of the sliding window.
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, Copy, PartialEq)]
struct Sample {
    bytes: u64,
    elapsed: Duration,
}

/// Sliding-window rate estimator for one transfer segment.
#[derive(Debug, Clone)]
pub struct RateEstimator {
    window: Duration,
    samples: VecDeque<Sample>,
}

impl Default for RateEstimator {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW)
    }
}

impl RateEstimator {
    /// Creates an estimator measuring over `window`.
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            samples: VecDeque::new(),
        }
    }

    /// Gets the window span.
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Forgets every sample, e.g. when a new segment starts after a resume.
    pub fn reset(&mut self) {
        self.samples.clear();
    }

    /// Records the cumulative byte count observed `elapsed` after the segment
    /// started.
    ///
    /// Samples going back in time or in bytes are ignored.
    pub fn record(&mut self, bytes: u64, elapsed: Duration) {
        if let Some(last) = self.samples.back() {
            if elapsed < last.elapsed || bytes < last.bytes {
                return;
            }
        }
        self.samples.push_back(Sample { bytes, elapsed });

        // Keep one sample at or before the window start so the window stays
        // fully covered.
        let horizon = elapsed.saturating_sub(self.window);
        while self.samples.len() > 2 && self.samples[1].elapsed <= horizon {
            self.samples.pop_front();
        }
    }

    /// Bytes per second across the window.
    ///
    /// `None` until two samples exist, when no time passed between them, or
    /// when no bytes arrived inside the window.
    pub fn rate(&self) -> Option<f64> {
        let first = self.samples.front()?;
        let last = self.samples.back()?;
        let span = last.elapsed.checked_sub(first.elapsed)?.as_secs_f64();
        let delta = last.bytes.checked_sub(first.bytes)?;
        if span <= 0.0 || delta == 0 {
            return None;
        }
        Some(delta as f64 / span)
    }

    /// Whole seconds until `total` bytes are reached at the current rate.
    pub fn remaining_secs(&self, total: u64) -> Option<u64> {
        let rate = self.rate()?;
        let bytes = self.samples.back()?.bytes;
        let remaining = total.saturating_sub(bytes);
        Some((remaining as f64 / rate).ceil() as u64)
    }
}
