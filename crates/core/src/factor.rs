//! Supported frame-multiplication factors.

use std::fmt;

use crate::error::PipelineError;

/// Frame-multiplication factor: how many output frames replace each
/// single input frame interval.
///
/// The set is closed. A factor is validated once, at job submission,
/// and is immutable for the lifetime of the job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(into = "u32", try_from = "u32")]
pub enum Factor {
    X4,
    X8,
}

impl Factor {
    /// All supported factors, lowest first.
    pub const ALL: [Factor; 2] = [Factor::X4, Factor::X8];

    /// The numeric multiplier `N`.
    pub fn multiplier(self) -> u32 {
        match self {
            Factor::X4 => 4,
            Factor::X8 => 8,
        }
    }

    /// Frames synthesized per consecutive source pair (`N - 1`).
    pub fn frames_per_gap(self) -> u32 {
        self.multiplier() - 1
    }
}

impl TryFrom<u32> for Factor {
    type Error = PipelineError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            4 => Ok(Factor::X4),
            8 => Ok(Factor::X8),
            other => Err(PipelineError::invalid_factor(other)),
        }
    }
}

impl From<Factor> for u32 {
    fn from(factor: Factor) -> u32 {
        factor.multiplier()
    }
}

impl fmt::Display for Factor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.multiplier())
    }
}
