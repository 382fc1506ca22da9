use std::fmt;

/// Failure classification for a processing job.
///
/// `Cancelled` is carried here even though it is a normal terminal
/// outcome, so a finished job record can always name the reason it
/// stopped with a single field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Requested factor is outside the supported set.
    InvalidFactor,
    /// Source is missing, unreadable, or not a decodable video.
    Input,
    /// Decoder failed mid-stream.
    Decode,
    /// Encoder failed to accept or finalize frames.
    Encode,
    /// Processing backend is absent or unresolvable.
    Unavailable,
    /// Run stopped on a cooperative cancellation signal.
    Cancelled,
    /// Anything that fits no other bucket.
    Unknown,
}

impl ErrorKind {
    /// True for cancellation, which finalizes a job as `Cancelled`
    /// rather than `Failed`.
    pub fn is_cancellation(self) -> bool {
        matches!(self, ErrorKind::Cancelled)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ErrorKind::InvalidFactor => "invalid factor",
            ErrorKind::Input => "input error",
            ErrorKind::Decode => "decode error",
            ErrorKind::Encode => "encode error",
            ErrorKind::Unavailable => "backend unavailable",
            ErrorKind::Cancelled => "cancelled",
            ErrorKind::Unknown => "unknown error",
        };
        f.write_str(label)
    }
}

/// Error produced by an engine run and recorded on the owning job.
#[derive(Debug, Clone, thiserror::Error, serde::Serialize, serde::Deserialize)]
#[error("{kind}: {message}")]
pub struct PipelineError {
    pub kind: ErrorKind,
    pub message: String,
}

impl PipelineError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn invalid_factor(requested: u32) -> Self {
        Self::new(
            ErrorKind::InvalidFactor,
            format!("unsupported factor {requested}, expected 4 or 8"),
        )
    }

    pub fn input(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Input, message)
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Decode, message)
    }

    pub fn encode(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Encode, message)
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unavailable, message)
    }

    pub fn cancelled() -> Self {
        Self::new(ErrorKind::Cancelled, "stopped before completion")
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unknown, message)
    }
}
