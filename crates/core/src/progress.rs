//! Rate-gated, monotonic job progress reporting.
//!
//! An engine run produces one progress sample per processed pair.
//! Publishing every sample would saturate the reporting channel, so a
//! gate decides which samples go out. Published values never decrease
//! and the terminal `1.0` always passes.

use std::time::{Duration, Instant};

/// Default minimum interval between published progress updates.
pub const DEFAULT_PROGRESS_INTERVAL: Duration = Duration::from_millis(200);

/// Decides which progress samples are worth publishing.
///
/// Admission rules, in order:
/// - samples are clamped to `[0.0, 1.0]` and ratcheted so published
///   values never decrease;
/// - `1.0` is always admitted, once;
/// - any other sample passes only `min_interval` after the last
///   admitted one.
#[derive(Debug)]
pub struct ProgressGate {
    min_interval: Duration,
    last_published: Option<Instant>,
    last_value: f32,
}

impl ProgressGate {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_published: None,
            last_value: 0.0,
        }
    }

    /// Feed one sample. `Some(v)` means "publish `v` now".
    pub fn admit(&mut self, now: Instant, sample: f32) -> Option<f32> {
        let value = sample.clamp(0.0, 1.0).max(self.last_value);
        let terminal = value >= 1.0;

        if terminal {
            if self.last_value >= 1.0 {
                return None;
            }
        } else if let Some(last) = self.last_published {
            if now.duration_since(last) < self.min_interval {
                return None;
            }
        }

        self.last_published = Some(now);
        self.last_value = value;
        Some(value)
    }

    /// Highest value published so far.
    pub fn current(&self) -> f32 {
        self.last_value
    }
}
