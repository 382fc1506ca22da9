//! Persisted artifact naming convention.
//!
//! Processed outputs are named `VID_<millisecond-timestamp>.mp4` and
//! advertised as `video/mp4`. Comparison lookups order and pair
//! artifacts by the embedded timestamp, so the parser lives next to
//! the builder.

/// Filename prefix for persisted video artifacts.
pub const ARTIFACT_PREFIX: &str = "VID_";
/// Container extension for persisted video artifacts.
pub const ARTIFACT_EXTENSION: &str = ".mp4";
/// MIME type advertised for persisted video artifacts.
pub const MIME_VIDEO_MP4: &str = "video/mp4";

/// Build an artifact filename from a millisecond Unix timestamp.
///
/// # Examples
///
/// ```
/// use frameloom_core::naming::artifact_file_name;
///
/// assert_eq!(artifact_file_name(1723986543210), "VID_1723986543210.mp4");
/// ```
pub fn artifact_file_name(timestamp_millis: i64) -> String {
    format!("{ARTIFACT_PREFIX}{timestamp_millis}{ARTIFACT_EXTENSION}")
}

/// Recover the millisecond timestamp from a conforming artifact
/// filename. `None` for names outside the convention.
pub fn parse_artifact_timestamp(file_name: &str) -> Option<i64> {
    file_name
        .strip_prefix(ARTIFACT_PREFIX)?
        .strip_suffix(ARTIFACT_EXTENSION)?
        .parse()
        .ok()
}
