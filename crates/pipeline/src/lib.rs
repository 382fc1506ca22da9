//! The frame interpolation engine.
//!
//! [`InterpolationEngine::run`] turns one source into its
//! frame-multiplied version: decode pairwise, synthesize `N-1`
//! intermediates per gap, encode everything in timestamp order. Runs
//! are synchronous and cooperative; callers schedule them on worker
//! threads and observe them through a [`ProgressSink`] and the returned
//! result.

pub mod engine;

pub use engine::{InterpolationEngine, ProgressSink};
