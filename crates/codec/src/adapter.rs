//! Capability traits between the interpolation engine and a concrete
//! media backend.
//!
//! Everything here is blocking by contract: implementations may touch
//! pipes, disks, and child processes, so callers run them on worker
//! threads, never on the interactive path.

use std::fmt;

use frameloom_core::{MediaRef, PipelineError};

use crate::frame::{EncoderParams, Frame, VideoParams};

/// Error type for codec adapter operations.
///
/// Variants map one-to-one onto the job failure taxonomy so the engine
/// can classify without inspecting messages.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("codec backend unavailable: {0}")]
    Unavailable(String),

    #[error("unusable input: {0}")]
    Input(String),

    #[error("decode failed: {0}")]
    Decode(String),

    #[error("encode failed: {0}")]
    Encode(String),
}

impl From<CodecError> for PipelineError {
    fn from(err: CodecError) -> Self {
        match err {
            CodecError::Unavailable(msg) => PipelineError::unavailable(msg),
            CodecError::Input(msg) => PipelineError::input(msg),
            CodecError::Decode(msg) => PipelineError::decode(msg),
            CodecError::Encode(msg) => PipelineError::encode(msg),
        }
    }
}

/// A concrete media backend: probes sources, opens decoders, opens
/// encoders. The engine depends only on this seam, so any backend that
/// can produce and accept packed RGB24 frames plugs in.
pub trait CodecAdapter: Send + Sync {
    /// Inspect a source without decoding it.
    fn probe(&self, source: &MediaRef) -> Result<VideoParams, CodecError>;

    /// Open a forward-only decoder. The frame sequence is finite,
    /// ordered by strictly increasing presentation timestamp, and
    /// cannot be restarted within one handle.
    fn open_decoder(&self, source: &MediaRef) -> Result<Box<dyn FrameDecoder>, CodecError>;

    /// Open an encoder writing to `output` with the given parameters.
    /// An existing artifact at `output` is replaced.
    fn open_encoder(
        &self,
        output: &MediaRef,
        params: &EncoderParams,
    ) -> Result<Box<dyn FrameEncoder>, CodecError>;
}

/// Forward-only frame source over one opened media stream.
pub trait FrameDecoder: Send {
    /// Parameters of the opened stream.
    fn params(&self) -> &VideoParams;

    /// Next frame in presentation order, `None` at end of stream.
    fn next_frame(&mut self) -> Result<Option<Frame>, CodecError>;
}

impl fmt::Debug for dyn FrameDecoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("dyn FrameDecoder")
    }
}

/// Frame sink over one output container.
///
/// Exactly one of [`finish`](FrameEncoder::finish) or
/// [`abort`](FrameEncoder::abort) ends the handle. `abort` (and a
/// failed `finish`) leaves no artifact behind, so callers never observe
/// a completed-looking output for an unfinished run.
pub trait FrameEncoder: Send {
    /// Append one frame. Frames must arrive in strictly increasing
    /// timestamp order.
    fn write_frame(&mut self, frame: &Frame) -> Result<(), CodecError>;

    /// Finalize the container.
    fn finish(self: Box<Self>) -> Result<(), CodecError>;

    /// Stop and remove the partial output. Best effort; failures are
    /// logged, not returned.
    fn abort(self: Box<Self>);
}

impl fmt::Debug for dyn FrameEncoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("dyn FrameEncoder")
    }
}

/// Pixel synthesis for one intermediate frame.
///
/// `weight` is the temporal position between `a` (0.0) and `b` (1.0),
/// i.e. `k/N` for the `k`-th of the `N-1` synthesized frames in a gap.
/// The engine owns count, ordering, and timestamp placement; a backend
/// owns only the pixels.
pub trait InterpolationBackend: Send + Sync {
    /// Backend name for logs and availability reports.
    fn name(&self) -> &'static str;

    /// Synthesize the pixel buffer for the frame at `weight` between
    /// the bracketing pair. Both inputs are packed RGB24 of equal size.
    fn synthesize(&self, a: &Frame, b: &Frame, weight: f32) -> Result<Vec<u8>, CodecError>;
}
