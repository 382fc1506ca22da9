//! Job orchestration for the frame interpolation pipeline.
//!
//! [`JobManager`] accepts processing requests, runs them on a bounded
//! worker pool over a shared [`InterpolationEngine`], and tracks each
//! [`ProcessingJob`] to a terminal state. Callers observe jobs only
//! through whole-record status snapshots and the [`JobEvent`] stream.
//!
//! [`InterpolationEngine`]: frameloom_pipeline::InterpolationEngine

pub mod events;
pub mod job;
pub mod manager;

pub use events::JobEvent;
pub use job::{JobState, ProcessingJob};
pub use manager::{JobManager, JobManagerConfig};
