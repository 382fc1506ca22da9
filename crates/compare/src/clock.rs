//! Pure frame scheduling for looped playback.

use std::time::Duration;

use frameloom_codec::VideoParams;
use frameloom_core::{timeline, PipelineError};

/// Which frame a looping stream owes the viewer at a given moment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FramePosition {
    /// Frame index within the stream, `0..frame_count`.
    pub index: u64,
    /// How many full loops have elapsed.
    pub cycle: u64,
}

/// Frame clock for one stream, fixed at open time.
///
/// The clock is pure: the due frame is always a function of elapsed
/// time since the shared epoch, never of how long decoding took. A
/// late frame is thereby dropped instead of shifting the schedule, and
/// two clocks built over the same epoch stay aligned without any
/// cross-stream coordination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameClock {
    interval_us: i64,
    frame_count: u64,
    duration_us: i64,
}

impl FrameClock {
    /// Builds a clock from probed stream parameters.
    ///
    /// Playback needs a finite frame count and a usable rate; streams
    /// without either cannot be scheduled.
    pub fn from_params(params: &VideoParams) -> Result<Self, PipelineError> {
        let interval_us = timeline::frame_interval_us(params.fps);
        if params.frame_count == 0 || interval_us <= 0 {
            return Err(PipelineError::input(
                "stream reports no usable timing for playback",
            ));
        }
        Ok(Self {
            interval_us,
            frame_count: params.frame_count,
            duration_us: interval_us * params.frame_count as i64,
        })
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Nominal frame interval.
    pub fn interval(&self) -> Duration {
        Duration::from_micros(self.interval_us as u64)
    }

    /// One full loop of the stream.
    pub fn cycle_duration(&self) -> Duration {
        Duration::from_micros(self.duration_us as u64)
    }

    /// The frame due at `elapsed` since the epoch.
    pub fn due(&self, elapsed: Duration) -> FramePosition {
        let elapsed_us = saturating_micros(elapsed);
        let cycle = (elapsed_us / self.duration_us) as u64;
        let within_us = elapsed_us % self.duration_us;
        let index = ((within_us / self.interval_us) as u64).min(self.frame_count - 1);
        FramePosition { index, cycle }
    }

    /// Time until the next frame boundary after `elapsed`.
    pub fn until_next(&self, elapsed: Duration) -> Duration {
        let elapsed_us = saturating_micros(elapsed);
        let next_us = (elapsed_us / self.interval_us + 1) * self.interval_us;
        Duration::from_micros((next_us - elapsed_us) as u64)
    }
}

fn saturating_micros(elapsed: Duration) -> i64 {
    elapsed.as_micros().min(i64::MAX as u128) as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn params(fps: f64, frame_count: u64) -> VideoParams {
        VideoParams {
            width: 8,
            height: 8,
            fps,
            frame_count,
            duration_us: 0,
        }
    }

    fn clock_50fps_5frames() -> FrameClock {
        FrameClock::from_params(&params(50.0, 5)).unwrap()
    }

    #[test]
    fn due_advances_one_index_per_interval() {
        let clock = clock_50fps_5frames();
        assert_eq!(clock.interval(), Duration::from_micros(20_000));
        assert_eq!(clock.cycle_duration(), Duration::from_micros(100_000));

        let at = |us: u64| clock.due(Duration::from_micros(us));
        assert_eq!(at(0), FramePosition { index: 0, cycle: 0 });
        assert_eq!(at(19_999), FramePosition { index: 0, cycle: 0 });
        assert_eq!(at(20_000), FramePosition { index: 1, cycle: 0 });
        assert_eq!(at(99_999), FramePosition { index: 4, cycle: 0 });
    }

    #[test]
    fn playback_wraps_to_the_first_frame() {
        let clock = clock_50fps_5frames();
        let at = |us: u64| clock.due(Duration::from_micros(us));
        assert_eq!(at(100_000), FramePosition { index: 0, cycle: 1 });
        assert_eq!(at(250_000), FramePosition { index: 2, cycle: 2 });
    }

    #[test]
    fn until_next_counts_down_to_the_frame_boundary() {
        let clock = clock_50fps_5frames();
        let from = |us: u64| clock.until_next(Duration::from_micros(us));
        assert_eq!(from(0), Duration::from_micros(20_000));
        assert_eq!(from(5_000), Duration::from_micros(15_000));
        assert_eq!(from(20_000), Duration::from_micros(20_000));
        assert_eq!(from(119_999), Duration::from_micros(1));
    }

    #[test]
    fn streams_without_timing_are_rejected() {
        let err = FrameClock::from_params(&params(0.0, 10)).unwrap_err();
        assert_eq!(err.kind, frameloom_core::ErrorKind::Input);
        assert_matches!(FrameClock::from_params(&params(30.0, 0)), Err(_));
    }

    #[test]
    fn two_clocks_on_one_epoch_wrap_together_when_durations_match() {
        // 5 frames at 50 fps and 20 frames at 200 fps both last 100 ms.
        let original = clock_50fps_5frames();
        let processed = FrameClock::from_params(&params(200.0, 20)).unwrap();

        let elapsed = Duration::from_micros(100_000);
        assert_eq!(original.due(elapsed).cycle, 1);
        assert_eq!(processed.due(elapsed).cycle, 1);
        assert_eq!(original.due(elapsed).index, 0);
        assert_eq!(processed.due(elapsed).index, 0);
    }
}
