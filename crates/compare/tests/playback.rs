//! Playback tests for [`ComparisonSession`] over the in-memory codec
//! adapter, observing only the public surface: the frame sink, the
//! boundary, and close().

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use assert_matches::assert_matches;

use frameloom_codec::{MemoryCodec, MemorySource};
use frameloom_compare::{ComparisonSession, FrameSink, PresentedFrame, StreamSide};
use frameloom_core::{ErrorKind, MediaRef};

/// Records every presented frame as `(side, index, cycle)`.
#[derive(Default)]
struct Collector {
    presented: Mutex<Vec<(StreamSide, u64, u64)>>,
}

impl FrameSink for Collector {
    fn present(&self, frame: PresentedFrame) {
        self.presented
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((frame.side, frame.index, frame.cycle));
    }
}

impl Collector {
    fn len(&self) -> usize {
        self.presented
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// `(index, cycle)` sequence for one side, in presentation order.
    fn side(&self, side: StreamSide) -> Vec<(u64, u64)> {
        self.presented
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|(s, _, _)| *s == side)
            .map(|(_, index, cycle)| (*index, *cycle))
            .collect()
    }
}

fn register_pair(codec: &MemoryCodec) -> (MediaRef, MediaRef) {
    // Both clips loop every 200 ms; the processed one at 10x the rate.
    codec.register("compare/original", MemorySource::new(8, 8, 10.0, 2));
    codec.register("compare/processed", MemorySource::new(8, 8, 100.0, 20));
    (
        MediaRef::new("compare/original"),
        MediaRef::new("compare/processed"),
    )
}

// ---------------------------------------------------------------------------
// Test: both streams play at their own cadence from one shared epoch
// ---------------------------------------------------------------------------

#[tokio::test]
async fn both_streams_play_at_their_own_cadence() {
    let codec = MemoryCodec::new();
    let (original, processed) = register_pair(&codec);
    let sink = Arc::new(Collector::default());

    let session = ComparisonSession::open(
        Arc::new(codec),
        original,
        processed,
        Arc::clone(&sink) as Arc<dyn FrameSink>,
    )
    .await
    .expect("session opens");

    tokio::time::sleep(Duration::from_millis(330)).await;
    session.close().await;

    let original = sink.side(StreamSide::Original);
    let processed = sink.side(StreamSide::Processed);

    // The slow stream starts at its first frame and wraps back to it.
    assert_eq!(original.first(), Some(&(0, 0)));
    assert!(original.contains(&(1, 0)));
    assert!(original.iter().any(|&(_, cycle)| cycle >= 1));

    // Presentation order never goes backwards on either side.
    for (frames, frame_count) in [(&original, 2u64), (&processed, 20u64)] {
        let keys: Vec<u64> = frames
            .iter()
            .map(|&(index, cycle)| cycle * frame_count + index)
            .collect();
        assert!(keys.windows(2).all(|pair| pair[0] < pair[1]));
    }

    // Ten times the frame rate means many more presentations.
    assert!(!processed.is_empty());
    assert!(processed.len() > original.len());
}

// ---------------------------------------------------------------------------
// Test: close() stops both playback loops
// ---------------------------------------------------------------------------

#[tokio::test]
async fn close_stops_presentations() {
    let codec = MemoryCodec::new();
    let (original, processed) = register_pair(&codec);
    let sink = Arc::new(Collector::default());

    let session = ComparisonSession::open(
        Arc::new(codec),
        original,
        processed,
        Arc::clone(&sink) as Arc<dyn FrameSink>,
    )
    .await
    .expect("session opens");

    tokio::time::sleep(Duration::from_millis(60)).await;
    session.close().await;

    let after_close = sink.len();
    tokio::time::sleep(Duration::from_millis(80)).await;
    assert_eq!(sink.len(), after_close);
}

// ---------------------------------------------------------------------------
// Test: drags clamp and saturate through the session surface
// ---------------------------------------------------------------------------

#[tokio::test]
async fn boundary_drags_saturate_at_the_edges() {
    let codec = MemoryCodec::new();
    let (original, processed) = register_pair(&codec);
    let sink = Arc::new(Collector::default());

    let session = ComparisonSession::open(
        Arc::new(codec),
        original,
        processed,
        Arc::clone(&sink) as Arc<dyn FrameSink>,
    )
    .await
    .expect("session opens");

    assert_eq!(session.boundary(), 0.5);
    session.drag_boundary(0.9);
    assert_eq!(session.boundary(), 1.0);
    session.drag_boundary(0.9);
    assert_eq!(session.boundary(), 1.0);

    session.set_boundary(0.25);
    assert_eq!(session.boundary(), 0.25);
    session.drag_boundary(-0.9);
    assert_eq!(session.boundary(), 0.0);

    // The due position is always a frame the stream actually has.
    let due = session.due_position(StreamSide::Processed);
    assert!(due.index < 20);

    session.close().await;
}

// ---------------------------------------------------------------------------
// Test: a stream that cannot be probed refuses to open
// ---------------------------------------------------------------------------

#[tokio::test]
async fn open_rejects_an_unknown_stream() {
    let codec = MemoryCodec::new();
    codec.register("compare/original", MemorySource::small(4));
    let sink = Arc::new(Collector::default());

    let err = ComparisonSession::open(
        Arc::new(codec),
        MediaRef::new("compare/original"),
        MediaRef::new("compare/never-registered"),
        sink as Arc<dyn FrameSink>,
    )
    .await
    .expect_err("unknown stream is rejected");

    assert_matches!(err.kind, ErrorKind::Input);
}
