//! Media codec seam: frame types, adapter traits, and the shipped
//! adapters.
//!
//! - [`CodecAdapter`] / [`FrameDecoder`] / [`FrameEncoder`]: blocking
//!   capability traits the interpolation engine drives.
//! - [`InterpolationBackend`]: pixel synthesis for one intermediate
//!   frame; [`BlendBackend`] is the default implementation.
//! - [`FfmpegCodec`]: production adapter over ffmpeg/ffprobe child
//!   processes.
//! - [`MemoryCodec`]: in-memory adapter for development and tests.

pub mod adapter;
pub mod blend;
pub mod ffmpeg;
pub mod frame;
pub mod memory;

pub use adapter::{CodecAdapter, CodecError, FrameDecoder, FrameEncoder, InterpolationBackend};
pub use blend::BlendBackend;
pub use ffmpeg::FfmpegCodec;
pub use frame::{EncoderParams, Frame, VideoParams};
pub use memory::{MemoryCodec, MemorySource};
