use std::fmt;
use std::path::{Path, PathBuf};

/// Job identifiers are random UUIDs, assigned at submission.
pub type JobId = uuid::Uuid;

/// All record timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Opaque locator for a media source or artifact.
///
/// The orchestrator and comparison layer treat this purely as an
/// identity. Only a codec adapter interprets it: the ffmpeg adapter
/// reads it as a filesystem path, the in-memory adapter as a registry
/// key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct MediaRef(String);

impl MediaRef {
    pub fn new(locator: impl Into<String>) -> Self {
        Self(locator.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// View the locator as a filesystem path.
    pub fn as_path(&self) -> &Path {
        Path::new(&self.0)
    }
}

impl fmt::Display for MediaRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MediaRef {
    fn from(locator: &str) -> Self {
        Self(locator.to_string())
    }
}

impl From<String> for MediaRef {
    fn from(locator: String) -> Self {
        Self(locator)
    }
}

impl From<PathBuf> for MediaRef {
    fn from(path: PathBuf) -> Self {
        Self(path.to_string_lossy().into_owned())
    }
}

impl From<&Path> for MediaRef {
    fn from(path: &Path) -> Self {
        Self(path.to_string_lossy().into_owned())
    }
}
