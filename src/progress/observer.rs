//! Translation of transport events into progress updates.
//!
//! A [`TransferObserver`] belongs to one download record. It tracks where the
//! current segment started, how many bytes it should deliver and when it
//! began, and turns each raw byte count into a normalized fraction plus an
//! optional remaining-time estimate.

use super::estimator::RateEstimator;
use crate::download::Callbacks;

use std::time::{Duration, Instant};

/// Normalized progress for one event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Update {
    /// Fraction done in `[0, 1]`, `None` while the total size is unknown.
    pub fraction: Option<f64>,
    /// Estimated seconds left, `None` when no rate can be measured.
    pub remaining_secs: Option<u64>,
}

/// Per-transfer progress state.
#[derive(Debug, Clone)]
pub struct TransferObserver {
    start_bytes: u64,
    expected: Option<u64>,
    started_at: Instant,
    estimator: RateEstimator,
    reported: f64,
}

impl TransferObserver {
    /// Creates an observer for a segment starting at `start_bytes`.
    pub fn new(start_bytes: u64, window: Duration) -> Self {
        Self {
            start_bytes,
            expected: None,
            started_at: Instant::now(),
            estimator: RateEstimator::new(window),
            reported: 0.0,
        }
    }

    /// Byte offset the current segment began at.
    pub fn start_bytes(&self) -> u64 {
        self.start_bytes
    }

    /// Whether the current segment continues a partial file.
    pub fn is_resumed(&self) -> bool {
        self.start_bytes > 0
    }

    /// When the current segment began.
    pub fn started_at(&self) -> Instant {
        self.started_at
    }

    /// Span of the rate window.
    pub fn window(&self) -> Duration {
        self.estimator.window()
    }

    /// Full size of the file, once the transport announced the segment size.
    pub fn total(&self) -> Option<u64> {
        self.expected.map(|e| self.start_bytes.saturating_add(e))
    }

    /// The transport confirmed the segment: it starts at `offset` and should
    /// deliver `expected` more bytes.
    ///
    /// Timing and rate history restart here. The returned update places a
    /// resumed download at its partial size right away.
    pub fn started(&mut self, offset: u64, expected: Option<u64>) -> Update {
        self.start_bytes = offset;
        self.expected = expected;
        self.started_at = Instant::now();
        self.estimator.reset();
        self.estimator.record(offset, Duration::ZERO);
        if offset == 0 {
            // A restart from zero must be able to report low values again.
            self.reported = 0.0;
        }

        Update {
            fraction: self.fraction(offset),
            remaining_secs: None,
        }
    }

    /// `received` bytes of the current segment have arrived.
    pub fn progress(&mut self, received: u64) -> Update {
        let elapsed = self.started_at.elapsed();
        self.progress_at(received, elapsed)
    }

    /// Same as [`TransferObserver::progress`] with an explicit elapsed time.
    pub fn progress_at(&mut self, received: u64, elapsed: Duration) -> Update {
        let bytes = self.start_bytes.saturating_add(received);
        self.estimator.record(bytes, elapsed);

        Update {
            fraction: self.fraction(bytes),
            remaining_secs: self
                .total()
                .and_then(|total| self.estimator.remaining_secs(total)),
        }
    }

    /// Monotonic fraction for `bytes`.
    fn fraction(&mut self, bytes: u64) -> Option<f64> {
        let total = self.total()?;
        let fraction = if total == 0 {
            1.0
        } else {
            (bytes as f64 / total as f64).clamp(0.0, 1.0)
        };
        self.reported = self.reported.max(fraction);
        Some(self.reported)
    }
}

/// Hands an update to every subscription, in registration order.
pub(crate) fn fan_out(identifier: &str, subscriptions: &[Callbacks], update: Update) {
    if let Some(fraction) = update.fraction {
        for callbacks in subscriptions {
            callbacks.notify_progress(identifier, fraction);
        }
    }
    if let Some(seconds) = update.remaining_secs {
        for callbacks in subscriptions {
            callbacks.notify_remaining_time(identifier, seconds);
        }
    }
}
