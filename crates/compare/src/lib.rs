//! Side-by-side comparison playback.
//!
//! [`ComparisonSession`] plays an original clip and its processed
//! counterpart against one shared start epoch:
//!
//! - each stream keeps its own [`FrameClock`] at native cadence,
//! - the due frame is computed purely from elapsed time, so a slow
//!   decode drops frames instead of shifting the schedule,
//! - the [`RevealBoundary`] divides the rendered view between the two
//!   streams and is published atomically.

pub mod boundary;
pub mod clock;
pub mod session;

pub use boundary::{divider_x, RevealBoundary, DEFAULT_BOUNDARY};
pub use clock::{FrameClock, FramePosition};
pub use session::{ComparisonSession, FrameSink, PresentedFrame, StreamSide};
