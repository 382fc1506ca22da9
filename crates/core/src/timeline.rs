//! Frame timeline arithmetic for interpolated output.
//!
//! All presentation timestamps are integer microseconds. The placement
//! rule: for a consecutive source pair (`A` at `t_a`, `B` at `t_b`) and
//! factor `N`, the `N-1` synthesized frames sit at
//! `t_a + k·(t_b - t_a)/N` for `k = 1..N-1`, strictly between the pair.

use crate::factor::Factor;

/// Microseconds in one second.
pub const MICROS_PER_SECOND: i64 = 1_000_000;

/// Presentation timestamps of the frames synthesized between one
/// consecutive source pair.
///
/// Exactly `N-1` entries, strictly increasing and inside the open
/// interval `(t_a, t_b)` whenever `t_b - t_a >= N` microseconds, which
/// holds for any real frame interval. Division truncates.
pub fn intermediate_timestamps(t_a: i64, t_b: i64, factor: Factor) -> Vec<i64> {
    let n = i64::from(factor.multiplier());
    let delta = t_b - t_a;
    (1..n).map(|k| t_a + k * delta / n).collect()
}

/// Blend weight of the later frame for the `k`-th synthesized frame
/// (1-based), i.e. `k/N`.
pub fn blend_weight(k: u32, factor: Factor) -> f32 {
    k as f32 / factor.multiplier() as f32
}

/// Total output frames for a source of `frames` frames: every one of
/// the `frames - 1` gaps gains `N-1` synthesized frames.
pub fn output_frame_count(frames: u64, factor: Factor) -> u64 {
    if frames == 0 {
        return 0;
    }
    frames + (frames - 1) * u64::from(factor.frames_per_gap())
}

/// Nominal output frame rate after multiplication.
pub fn output_fps(source_fps: f64, factor: Factor) -> f64 {
    source_fps * f64::from(factor.multiplier())
}

/// Frame interval in microseconds for a nominal rate. Zero for a
/// non-positive rate.
pub fn frame_interval_us(fps: f64) -> i64 {
    if fps <= 0.0 {
        return 0;
    }
    (MICROS_PER_SECOND as f64 / fps).round() as i64
}
