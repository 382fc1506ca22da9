//! Atomically published reveal boundary for the comparison view.

use std::sync::atomic::{AtomicU32, Ordering};

/// Default divider position: half the viewport.
pub const DEFAULT_BOUNDARY: f32 = 0.5;

/// Reveal divider position as a fraction of the viewport width.
///
/// One writer (the drag handler) publishes positions; the render path
/// reads on its own cadence. The fraction is stored as raw `f32` bits
/// in an atomic, so a reader always observes a whole published value,
/// never a torn one.
#[derive(Debug)]
pub struct RevealBoundary {
    bits: AtomicU32,
}

impl RevealBoundary {
    pub fn new(fraction: f32) -> Self {
        Self {
            bits: AtomicU32::new(clamped_bits(fraction)),
        }
    }

    /// Current fraction in `[0.0, 1.0]`.
    pub fn fraction(&self) -> f32 {
        f32::from_bits(self.bits.load(Ordering::Acquire))
    }

    /// Publish an absolute position, clamped to `[0.0, 1.0]`.
    /// Non-finite input is ignored.
    pub fn set(&self, fraction: f32) {
        if !fraction.is_finite() {
            return;
        }
        self.bits.store(clamped_bits(fraction), Ordering::Release);
    }

    /// Shift the divider by a drag delta, saturating at the edges.
    pub fn drag_by(&self, delta: f32) {
        self.set(self.fraction() + delta);
    }
}

impl Default for RevealBoundary {
    fn default() -> Self {
        Self::new(DEFAULT_BOUNDARY)
    }
}

fn clamped_bits(fraction: f32) -> u32 {
    fraction.clamp(0.0, 1.0).to_bits()
}

/// X coordinate of the divider for a viewport of `width` pixels. The
/// processed stream renders left of this line, the original right.
pub fn divider_x(fraction: f32, width: u32) -> u32 {
    (fraction.clamp(0.0, 1.0) * width as f32).round() as u32
}
