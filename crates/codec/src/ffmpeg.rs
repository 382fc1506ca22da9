//! FFmpeg-backed codec adapter.
//!
//! Decoding and encoding are ffmpeg child processes streaming packed
//! RGB24 rawvideo over pipes; probing is a single ffprobe invocation
//! with JSON output. Binaries are resolved by name on `PATH` or by
//! explicit path. A spawn failure maps to [`CodecError::Unavailable`]
//! so a missing install degrades the feature instead of taking the
//! host process down.

use std::io::{Read, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

use serde::Deserialize;

use frameloom_core::MediaRef;

use crate::adapter::{CodecAdapter, CodecError, FrameDecoder, FrameEncoder};
use crate::frame::{EncoderParams, Frame, VideoParams};

/// Default decoder/encoder binary name.
pub const DEFAULT_FFMPEG: &str = "ffmpeg";
/// Default probe binary name.
pub const DEFAULT_FFPROBE: &str = "ffprobe";

/// Availability report for the ffmpeg toolchain.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ToolchainStatus {
    pub available: bool,
    pub detail: String,
}

/// Codec adapter backed by ffmpeg/ffprobe child processes.
pub struct FfmpegCodec {
    ffmpeg: String,
    ffprobe: String,
}

impl Default for FfmpegCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl FfmpegCodec {
    /// Adapter using `ffmpeg`/`ffprobe` from `PATH`.
    pub fn new() -> Self {
        Self::with_binaries(DEFAULT_FFMPEG, DEFAULT_FFPROBE)
    }

    /// Adapter using explicit binary names or paths.
    pub fn with_binaries(ffmpeg: impl Into<String>, ffprobe: impl Into<String>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            ffprobe: ffprobe.into(),
        }
    }

    /// Check that both binaries can be executed, without doing any
    /// work. Used for startup logging and availability reporting.
    pub fn detect(&self) -> ToolchainStatus {
        match (version_check(&self.ffmpeg), version_check(&self.ffprobe)) {
            (Ok(()), Ok(())) => ToolchainStatus {
                available: true,
                detail: format!("{} and {} present", self.ffmpeg, self.ffprobe),
            },
            (Err(detail), _) | (_, Err(detail)) => ToolchainStatus {
                available: false,
                detail,
            },
        }
    }
}

impl CodecAdapter for FfmpegCodec {
    fn probe(&self, source: &MediaRef) -> Result<VideoParams, CodecError> {
        let path = source.as_path();
        if !path.exists() {
            return Err(CodecError::Input(format!("video file not found: {source}")));
        }

        let output = Command::new(&self.ffprobe)
            .args([
                "-v",
                "quiet",
                "-print_format",
                "json",
                "-show_format",
                "-show_streams",
            ])
            .arg(path)
            .output()
            .map_err(|e| spawn_error(&self.ffprobe, &e))?;

        if !output.status.success() {
            return Err(CodecError::Input(format!(
                "ffprobe failed on {source} (exit code {:?}): {}",
                output.status.code(),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let probe: FfprobeOutput = serde_json::from_str(&stdout)
            .map_err(|e| CodecError::Input(format!("unparseable ffprobe output: {e}")))?;
        video_params(&probe)
    }

    fn open_decoder(&self, source: &MediaRef) -> Result<Box<dyn FrameDecoder>, CodecError> {
        let params = self.probe(source)?;
        if params.frame_interval_us() <= 0 {
            return Err(CodecError::Input(format!(
                "source {source} reports no usable frame rate"
            )));
        }

        let mut child = Command::new(&self.ffmpeg)
            .arg("-i")
            .arg(source.as_path())
            .args(["-f", "rawvideo", "-pix_fmt", "rgb24", "-"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| spawn_error(&self.ffmpeg, &e))?;

        let stdout = child.stdout.take().ok_or_else(|| {
            CodecError::Decode("ffmpeg decoder spawned without a stdout pipe".to_string())
        })?;

        let frame_size = params.frame_size();
        let interval_us = params.frame_interval_us();
        Ok(Box::new(FfmpegFrameDecoder {
            child,
            stdout: Some(stdout),
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
        let output_path = PathBuf::from(output.as_str());

        let mut child = Command::new(&self.ffmpeg)
            .args([
                "-y",
                "-f",
                "rawvideo",
                "-pix_fmt",
                "rgb24",
                "-s",
                &format!("{}x{}", params.width, params.height),
                "-r",
                &params.fps.to_string(),
                "-i",
                "-",
                "-an",
                "-pix_fmt",
                "yuv420p",
                "-movflags",
                "+faststart",
            ])
            .arg(&output_path)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| spawn_error(&self.ffmpeg, &e))?;

        let stdin = child.stdin.take().ok_or_else(|| {
            CodecError::Encode("ffmpeg encoder spawned without a stdin pipe".to_string())
        })?;

        Ok(Box::new(FfmpegFrameEncoder {
            child,
            stdin: Some(stdin),
            output_path,
            frame_size: params.frame_size(),
            last_pts_us: None,
        }))
    }
}

fn version_check(binary: &str) -> Result<(), String> {
    match Command::new(binary)
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
    {
        Ok(status) if status.success() => Ok(()),
        Ok(status) => Err(format!(
            "{binary} exited with code {:?} on -version",
            status.code()
        )),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(format!("{binary} not found on this system"))
        }
        Err(e) => Err(format!("{binary} could not be started: {e}")),
    }
}

fn spawn_error(binary: &str, err: &std::io::Error) -> CodecError {
    if err.kind() == std::io::ErrorKind::NotFound {
        CodecError::Unavailable(format!("{binary} not found on this system"))
    } else {
        CodecError::Unavailable(format!("{binary} could not be started: {err}"))
    }
}

// ---------------------------------------------------------------------------
// Decoder
// ---------------------------------------------------------------------------

/// Forward-only decoder over an ffmpeg rawvideo pipe.
///
/// Rawvideo carries no timestamps, so presentation times are derived
/// from the probed frame rate: frame `i` sits at `i * interval`.
struct FfmpegFrameDecoder {
    child: Child,
    stdout: Option<ChildStdout>,
    params: VideoParams,
    frame_size: usize,
    interval_us: i64,
    next_index: u64,
}

impl FrameDecoder for FfmpegFrameDecoder {
    fn params(&self) -> &VideoParams {
        &self.params
    }

    fn next_frame(&mut self) -> Result<Option<Frame>, CodecError> {
        let Some(stdout) = self.stdout.as_mut() else {
            return Ok(None);
        };

        let mut data = vec![0u8; self.frame_size];
        let mut filled = 0;
        while filled < data.len() {
            match stdout.read(&mut data[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    return Err(CodecError::Decode(format!(
                        "decoder pipe read failed at frame {}: {e}",
                        self.next_index
                    )))
                }
            }
        }

        if filled == 0 {
            // End of stream. The exit status tells a clean EOF apart
            // from a decoder crash.
            self.stdout = None;
            let status = self
                .child
                .wait()
                .map_err(|e| CodecError::Decode(format!("decoder wait failed: {e}")))?;
            if !status.success() {
                return Err(CodecError::Decode(format!(
                    "ffmpeg decoder exited with code {:?}",
                    status.code()
                )));
            }
            return Ok(None);
        }

        if filled < data.len() {
            return Err(CodecError::Decode(format!(
                "truncated frame at index {} ({filled} of {} bytes)",
                self.next_index, self.frame_size
            )));
        }

        let pts_us = self.next_index as i64 * self.interval_us;
        self.next_index += 1;
        Ok(Some(Frame { pts_us, data }))
    }
}

impl Drop for FfmpegFrameDecoder {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

// ---------------------------------------------------------------------------
// Encoder
// ---------------------------------------------------------------------------

/// Encoder over an ffmpeg rawvideo stdin pipe.
struct FfmpegFrameEncoder {
    child: Child,
    stdin: Option<ChildStdin>,
    output_path: PathBuf,
    frame_size: usize,
    last_pts_us: Option<i64>,
}

impl FrameEncoder for FfmpegFrameEncoder {
    fn write_frame(&mut self, frame: &Frame) -> Result<(), CodecError> {
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

        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| CodecError::Encode("encoder already closed".to_string()))?;
        stdin
            .write_all(&frame.data)
            .map_err(|e| CodecError::Encode(format!("encoder pipe write failed: {e}")))?;
        self.last_pts_us = Some(frame.pts_us);
        Ok(())
    }

    fn finish(mut self: Box<Self>) -> Result<(), CodecError> {
        // Closing stdin signals end of input and lets ffmpeg flush the
        // container.
        drop(self.stdin.take());
        let status = self
            .child
            .wait()
            .map_err(|e| CodecError::Encode(format!("encoder wait failed: {e}")))?;
        if !status.success() {
            remove_artifact(&self.output_path);
            return Err(CodecError::Encode(format!(
                "ffmpeg encoder exited with code {:?}",
                status.code()
            )));
        }
        Ok(())
    }

    fn abort(mut self: Box<Self>) {
        drop(self.stdin.take());
        let _ = self.child.kill();
        let _ = self.child.wait();
        remove_artifact(&self.output_path);
    }
}

impl Drop for FfmpegFrameEncoder {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

fn remove_artifact(path: &std::path::Path) {
    if let Err(e) = std::fs::remove_file(path) {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!(path = %path.display(), error = %e, "Failed to remove partial output");
        }
    }
}

// ---------------------------------------------------------------------------
// ffprobe JSON output structures
// ---------------------------------------------------------------------------

/// Top-level ffprobe JSON output (`-print_format json -show_format -show_streams`).
#[derive(Debug, Deserialize)]
pub struct FfprobeOutput {
    pub streams: Vec<FfprobeStream>,
    pub format: FfprobeFormat,
}

/// A single stream from ffprobe output.
#[derive(Debug, Deserialize)]
pub struct FfprobeStream {
    pub codec_type: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    /// e.g. "30/1" or "24000/1001"
    pub r_frame_rate: Option<String>,
    pub duration: Option<String>,
    pub nb_frames: Option<String>,
}

/// Format-level metadata from ffprobe.
#[derive(Debug, Deserialize)]
pub struct FfprobeFormat {
    pub duration: Option<String>,
}

// ---------------------------------------------------------------------------
// Parsing helpers
// ---------------------------------------------------------------------------

/// Find the first video stream in the ffprobe output.
fn first_video_stream(probe: &FfprobeOutput) -> Option<&FfprobeStream> {
    probe
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
}

/// Parse the duration in seconds, preferring format-level metadata.
fn parse_duration(probe: &FfprobeOutput) -> f64 {
    if let Some(d) = &probe.format.duration {
        if let Ok(secs) = d.parse::<f64>() {
            return secs;
        }
    }
    if let Some(stream) = first_video_stream(probe) {
        if let Some(d) = &stream.duration {
            if let Ok(secs) = d.parse::<f64>() {
                return secs;
            }
        }
    }
    0.0
}

/// Parse the video frame rate. `r_frame_rate` is a fraction like
/// `"30/1"` or `"24000/1001"`.
fn parse_framerate(probe: &FfprobeOutput) -> f64 {
    first_video_stream(probe)
        .and_then(|s| s.r_frame_rate.as_deref())
        .map(parse_fraction)
        .unwrap_or(0.0)
}

/// Parse a fraction string like `"30/1"` into a float.
fn parse_fraction(s: &str) -> f64 {
    let parts: Vec<&str> = s.split('/').collect();
    if parts.len() == 2 {
        let num = parts[0].parse::<f64>().unwrap_or(0.0);
        let den = parts[1].parse::<f64>().unwrap_or(1.0);
        if den > 0.0 {
            return num / den;
        }
    }
    s.parse::<f64>().unwrap_or(0.0)
}

/// Count total frames, falling back to duration × frame rate when the
/// container does not carry `nb_frames`.
fn parse_total_frames(probe: &FfprobeOutput) -> u64 {
    if let Some(stream) = first_video_stream(probe) {
        if let Some(nb) = &stream.nb_frames {
            if let Ok(n) = nb.parse::<u64>() {
                return n;
            }
        }
    }
    let duration = parse_duration(probe);
    let fps = parse_framerate(probe);
    if duration > 0.0 && fps > 0.0 {
        return (duration * fps).round() as u64;
    }
    0
}

/// Assemble [`VideoParams`] from a parsed probe, rejecting sources with
/// no usable video stream.
fn video_params(probe: &FfprobeOutput) -> Result<VideoParams, CodecError> {
    let stream = first_video_stream(probe)
        .ok_or_else(|| CodecError::Input("no video stream in source".to_string()))?;
    let (Some(width), Some(height)) = (stream.width, stream.height) else {
        return Err(CodecError::Input(
            "video stream reports no dimensions".to_string(),
        ));
    };

    Ok(VideoParams {
        width,
        height,
        fps: parse_framerate(probe),
        frame_count: parse_total_frames(probe),
        duration_us: (parse_duration(probe) * 1_000_000.0).round() as i64,
    })
}
