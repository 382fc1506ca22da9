//! Shared types and pure logic for the frameloom pipeline.
//!
//! This crate has no async or I/O surface. It holds the pieces every
//! other frameloom crate agrees on:
//!
//! - [`Factor`]: the closed set of supported multiplication factors.
//! - [`PipelineError`] / [`ErrorKind`]: the failure taxonomy processing
//!   jobs are finalized with.
//! - [`timeline`]: frame-count and timestamp-placement arithmetic.
//! - [`naming`]: the persisted artifact naming convention.
//! - [`progress`]: rate-gated, monotonic progress reporting.

pub mod error;
pub mod factor;
pub mod naming;
pub mod progress;
pub mod timeline;
pub mod types;

pub use error::{ErrorKind, PipelineError};
pub use factor::Factor;
pub use types::{JobId, MediaRef, Timestamp};
