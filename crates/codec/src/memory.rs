//! In-memory codec adapter for development and tests.
//!
//! Sources are registered up front as synthetic RGB24 clips; encoded
//! outputs are committed to a shared map only when the encoder
//! finishes, so an aborted or failed run leaves no artifact behind,
//! matching the filesystem adapter's contract. Failure injection and a
//! per-frame decode delay make the cancellation and partial-output
//! paths exercisable without a codec install.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use frameloom_core::{timeline, MediaRef};

use crate::adapter::{CodecAdapter, CodecError, FrameDecoder, FrameEncoder};
use crate::frame::{EncoderParams, Frame, VideoParams};

/// Spec of one registered synthetic source.
#[derive(Debug, Clone)]
pub struct MemorySource {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    pub frame_count: u64,
    /// Fail with a decode error when this frame index is reached.
    pub fail_decode_at: Option<u64>,
    /// Sleep this long before yielding each frame.
    pub frame_delay: Option<Duration>,
    /// Probe as an unsized stream (`frame_count` and `duration_us`
    /// both 0) while still decoding the real frames.
    pub hide_frame_count: bool,
}

impl MemorySource {
    pub fn new(width: u32, height: u32, fps: f64, frame_count: u64) -> Self {
        Self {
            width,
            height,
            fps,
            frame_count,
            fail_decode_at: None,
            frame_delay: None,
            hide_frame_count: false,
        }
    }

    /// Small 8x8 clip at 30 fps, enough for counting and timing tests.
    pub fn small(frame_count: u64) -> Self {
        Self::new(8, 8, 30.0, frame_count)
    }
}

/// A committed encode: parameters plus the full frame sequence.
#[derive(Debug, Clone)]
pub struct CapturedClip {
    pub params: EncoderParams,
    pub frames: Vec<Frame>,
}

#[derive(Default)]
struct MemoryState {
    sources: HashMap<String, MemorySource>,
    outputs: HashMap<String, CapturedClip>,
    encode_failures: HashMap<String, u64>,
}

/// Codec adapter over registered in-memory sources.
#[derive(Clone, Default)]
pub struct MemoryCodec {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryCodec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a synthetic source under a locator.
    pub fn register(&self, locator: impl Into<String>, source: MemorySource) {
        self.lock().sources.insert(locator.into(), source);
    }

    /// Make the encoder for `output` fail once it has accepted
    /// `at_frame` frames.
    pub fn inject_encode_failure(&self, output: impl Into<String>, at_frame: u64) {
        self.lock().encode_failures.insert(output.into(), at_frame);
    }

    /// The committed clip for `output`, if an encode finished there.
    pub fn output(&self, output: &MediaRef) -> Option<CapturedClip> {
        self.lock().outputs.get(output.as_str()).cloned()
    }

    /// Whether a finished artifact exists at `output`.
    pub fn has_output(&self, output: &MediaRef) -> bool {
        self.lock().outputs.contains_key(output.as_str())
    }

    /// How many finished artifacts exist, across all locators.
    pub fn output_count(&self) -> usize {
        self.lock().outputs.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn source(&self, locator: &MediaRef) -> Result<MemorySource, CodecError> {
        self.lock()
            .sources
            .get(locator.as_str())
            .cloned()
            .ok_or_else(|| CodecError::Input(format!("no such source registered: {locator}")))
    }
}

fn params_of(spec: &MemorySource) -> VideoParams {
    let (frame_count, duration_us) = if spec.hide_frame_count {
        (0, 0)
    } else if spec.fps > 0.0 {
        (
            spec.frame_count,
            (spec.frame_count as f64 / spec.fps * 1_000_000.0).round() as i64,
        )
    } else {
        (spec.frame_count, 0)
    };
    VideoParams {
        width: spec.width,
        height: spec.height,
        fps: spec.fps,
        frame_count,
        duration_us,
    }
}

/// Deterministic pixel fill: byte `j` of frame `i` is `(i + j) mod 256`.
fn synthetic_data(index: u64, frame_size: usize) -> Vec<u8> {
    (0..frame_size)
        .map(|j| (index as usize).wrapping_add(j) as u8)
        .collect()
}

impl CodecAdapter for MemoryCodec {
    fn probe(&self, source: &MediaRef) -> Result<VideoParams, CodecError> {
        Ok(params_of(&self.source(source)?))
    }

    fn open_decoder(&self, source: &MediaRef) -> Result<Box<dyn FrameDecoder>, CodecError> {
        let spec = self.source(source)?;
        let params = params_of(&spec);
        let frame_size = params.frame_size();
        let interval_us = timeline::frame_interval_us(spec.fps);
        if interval_us <= 0 {
            return Err(CodecError::Input(format!(
                "source {source} reports no usable frame rate"
            )));
        }
        Ok(Box::new(MemoryFrameDecoder {
            spec,
            params,
            frame_size,
            interval_us,
            next_index: 0,
        }))
    }

    fn open_encoder(
        &self,
        output: &MediaRef,
        params: &EncoderParams,
    ) -> Result<Box<dyn FrameEncoder>, CodecError> {
        let fail_at = self.lock().encode_failures.get(output.as_str()).copied();
        Ok(Box::new(MemoryFrameEncoder {
            state: Arc::clone(&self.state),
            locator: output.as_str().to_string(),
            params: params.clone(),
            frame_size: params.frame_size(),
            fail_at,
            frames: Vec::new(),
            last_pts_us: None,
        }))
    }
}

struct MemoryFrameDecoder {
    spec: MemorySource,
    params: VideoParams,
    frame_size: usize,
    interval_us: i64,
    next_index: u64,
}

impl FrameDecoder for MemoryFrameDecoder {
    fn params(&self) -> &VideoParams {
        &self.params
    }

    fn next_frame(&mut self) -> Result<Option<Frame>, CodecError> {
        if self.spec.fail_decode_at == Some(self.next_index) {
            return Err(CodecError::Decode(format!(
                "injected decode failure at frame {}",
                self.next_index
            )));
        }
        if self.next_index >= self.spec.frame_count {
            return Ok(None);
        }
        if let Some(delay) = self.spec.frame_delay {
            std::thread::sleep(delay);
        }

        let frame = Frame {
            pts_us: self.next_index as i64 * self.interval_us,
            data: synthetic_data(self.next_index, self.frame_size),
        };
        self.next_index += 1;
        Ok(Some(frame))
    }
}

struct MemoryFrameEncoder {
    state: Arc<Mutex<MemoryState>>,
    locator: String,
    params: EncoderParams,
    frame_size: usize,
    fail_at: Option<u64>,
    frames: Vec<Frame>,
    last_pts_us: Option<i64>,
}

impl FrameEncoder for MemoryFrameEncoder {
    fn write_frame(&mut self, frame: &Frame) -> Result<(), CodecError> {
        if self.fail_at == Some(self.frames.len() as u64) {
            return Err(CodecError::Encode(format!(
                "injected encode failure at frame {}",
                self.frames.len()
            )));
        }
        if frame.data.len() != self.frame_size {
            return Err(CodecError::Encode(format!(
                "frame size mismatch: got {} bytes, expected {}",
                frame.data.len(),
                self.frame_size
            )));
        }
        if let Some(last) = self.last_pts_us {
            if frame.pts_us <= last {
                return Err(CodecError::Encode(format!(
                    "non-increasing timestamp: {} after {last}",
                    frame.pts_us
                )));
            }
        }
        self.last_pts_us = Some(frame.pts_us);
        self.frames.push(frame.clone());
        Ok(())
    }

    fn finish(self: Box<Self>) -> Result<(), CodecError> {
        let clip = CapturedClip {
            params: self.params,
            frames: self.frames,
        };
        let mut state = self
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        state.outputs.insert(self.locator, clip);
        Ok(())
    }

    fn abort(self: Box<Self>) {
        // Nothing was committed, so there is nothing to remove.
    }
}
