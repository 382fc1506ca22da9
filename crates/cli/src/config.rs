//! CLI configuration loaded from environment variables.

use std::path::PathBuf;
use std::time::Duration;

use frameloom_codec::ffmpeg::{DEFAULT_FFMPEG, DEFAULT_FFPROBE};
use frameloom_jobs::manager::DEFAULT_OUTPUT_DIR;

/// Runtime configuration, with defaults suitable for local use.
///
/// | Env Var                          | Default   |
/// |----------------------------------|-----------|
/// | `FRAMELOOM_WORKERS`              | `1`       |
/// | `FRAMELOOM_OUTPUT_DIR`           | `media`   |
/// | `FRAMELOOM_FFMPEG`               | `ffmpeg`  |
/// | `FRAMELOOM_FFPROBE`              | `ffprobe` |
/// | `FRAMELOOM_PROGRESS_INTERVAL_MS` | `200`     |
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Concurrent processing jobs.
    pub workers: usize,
    /// Directory where finished artifacts land.
    pub output_dir: PathBuf,
    /// ffmpeg binary name or path.
    pub ffmpeg: String,
    /// ffprobe binary name or path.
    pub ffprobe: String,
    /// Minimum interval between progress updates.
    pub progress_interval: Duration,
}

impl AppConfig {
    /// Load configuration from environment variables with defaults.
    /// Panics on malformed values; misconfiguration should fail fast
    /// at startup.
    pub fn from_env() -> Self {
        let workers: usize = std::env::var("FRAMELOOM_WORKERS")
            .unwrap_or_else(|_| "1".into())
            .parse()
            .expect("FRAMELOOM_WORKERS must be a valid usize");

        let output_dir = PathBuf::from(
            std::env::var("FRAMELOOM_OUTPUT_DIR").unwrap_or_else(|_| DEFAULT_OUTPUT_DIR.into()),
        );

        let ffmpeg =
            std::env::var("FRAMELOOM_FFMPEG").unwrap_or_else(|_| DEFAULT_FFMPEG.into());
        let ffprobe =
            std::env::var("FRAMELOOM_FFPROBE").unwrap_or_else(|_| DEFAULT_FFPROBE.into());

        let progress_interval_ms: u64 = std::env::var("FRAMELOOM_PROGRESS_INTERVAL_MS")
            .unwrap_or_else(|_| "200".into())
            .parse()
            .expect("FRAMELOOM_PROGRESS_INTERVAL_MS must be a valid u64");

        Self {
            workers,
            output_dir,
            ffmpeg,
            ffprobe,
            progress_interval: Duration::from_millis(progress_interval_ms),
        }
    }
}
