use frameloom_core::timeline;
use frameloom_core::Factor;

/// One decoded video frame: packed RGB24 pixels plus presentation time.
///
/// Ownership is transient; frames live only inside a processing or
/// playback window, never as persisted collections.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// Presentation timestamp in microseconds.
    pub pts_us: i64,
    /// Packed RGB24 pixel data, `width * height * 3` bytes.
    pub data: Vec<u8>,
}

/// Stream parameters reported by a probe or an opened decoder.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct VideoParams {
    pub width: u32,
    pub height: u32,
    /// Nominal frame rate.
    pub fps: f64,
    /// Best-effort source frame count; 0 when unknown.
    pub frame_count: u64,
    /// Duration in microseconds; 0 when unknown.
    pub duration_us: i64,
}

impl VideoParams {
    /// Bytes per packed RGB24 frame.
    pub fn frame_size(&self) -> usize {
        self.width as usize * self.height as usize * 3
    }

    /// Nominal frame interval in microseconds.
    pub fn frame_interval_us(&self) -> i64 {
        timeline::frame_interval_us(self.fps)
    }
}

/// Parameters for an encoder handle.
#[derive(Debug, Clone, PartialEq)]
pub struct EncoderParams {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
}

impl EncoderParams {
    /// Encoder parameters for the multiplied version of a source:
    /// same geometry, frame rate scaled by the factor.
    pub fn multiplied(source: &VideoParams, factor: Factor) -> Self {
        Self {
            width: source.width,
            height: source.height,
            fps: timeline::output_fps(source.fps, factor),
        }
    }

    /// Bytes per packed RGB24 frame.
    pub fn frame_size(&self) -> usize {
        self.width as usize * self.height as usize * 3
    }
}
