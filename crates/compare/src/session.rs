//! Dual-stream comparison playback session.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use frameloom_codec::{CodecAdapter, CodecError, Frame, FrameDecoder};
use frameloom_core::{MediaRef, PipelineError};

use crate::boundary::RevealBoundary;
use crate::clock::{FrameClock, FramePosition};

/// Bounded wait for playback loops during [`ComparisonSession::close`].
const CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

/// Upper bound on one playback sleep, so cancellation is observed
/// promptly even for low frame rates.
const PLAYER_POLL: Duration = Duration::from_millis(25);

/// Which stream of the comparison a frame belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamSide {
    Original,
    Processed,
}

impl fmt::Display for StreamSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            StreamSide::Original => "original",
            StreamSide::Processed => "processed",
        };
        write!(f, "{label}")
    }
}

/// A frame delivered to the render layer, tagged with its schedule
/// position.
#[derive(Debug, Clone)]
pub struct PresentedFrame {
    pub side: StreamSide,
    pub index: u64,
    pub cycle: u64,
    pub frame: Frame,
}

/// Receives due frames from the playback loops.
///
/// Called from playback threads, so implementations must tolerate
/// concurrent invocation for the two sides.
pub trait FrameSink: Send + Sync {
    fn present(&self, frame: PresentedFrame);
}

/// Plays an original clip and its processed counterpart against one
/// shared start epoch.
///
/// Each stream runs its own playback loop at native cadence; the due
/// frame is always recomputed from elapsed wall time, so neither
/// stream's decode speed can shift the other's schedule. The reveal
/// boundary divides the rendered view: the processed stream shows left
/// of the divider, the original right. Boundary writes are meant to
/// come from the single interaction context; reads are safe anywhere.
#[derive(Debug)]
pub struct ComparisonSession {
    epoch: Instant,
    original_clock: FrameClock,
    processed_clock: FrameClock,
    boundary: RevealBoundary,
    cancel: CancellationToken,
    players: Mutex<Vec<JoinHandle<()>>>,
}

impl ComparisonSession {
    /// Probes both streams and starts their playback loops.
    pub async fn open(
        adapter: Arc<dyn CodecAdapter>,
        original: MediaRef,
        processed: MediaRef,
        sink: Arc<dyn FrameSink>,
    ) -> Result<Arc<Self>, PipelineError> {
        let probe_adapter = Arc::clone(&adapter);
        let probe_original = original.clone();
        let probe_processed = processed.clone();
        let (original_params, processed_params) = tokio::task::spawn_blocking(move || {
            let original = probe_adapter.probe(&probe_original)?;
            let processed = probe_adapter.probe(&probe_processed)?;
            Ok::<_, CodecError>((original, processed))
        })
        .await
        .map_err(|err| PipelineError::unknown(format!("probe task aborted: {err}")))??;

        let original_clock = FrameClock::from_params(&original_params)?;
        let processed_clock = FrameClock::from_params(&processed_params)?;

        // Both loops measure elapsed time from this one instant.
        let epoch = Instant::now();
        let cancel = CancellationToken::new();

        let mut players = Vec::with_capacity(2);
        let streams = [
            (StreamSide::Original, original.clone(), original_clock),
            (StreamSide::Processed, processed.clone(), processed_clock),
        ];
        for (side, source, clock) in streams {
            let task = PlayerTask {
                adapter: Arc::clone(&adapter),
                source,
                side,
                clock,
                epoch,
                sink: Arc::clone(&sink),
                cancel: cancel.child_token(),
            };
            players.push(tokio::task::spawn_blocking(move || run_player(task)));
        }

        info!(%original, %processed, "Comparison session opened");
        Ok(Arc::new(Self {
            epoch,
            original_clock,
            processed_clock,
            boundary: RevealBoundary::default(),
            cancel,
            players: Mutex::new(players),
        }))
    }

    /// Current reveal boundary fraction.
    pub fn boundary(&self) -> f32 {
        self.boundary.fraction()
    }

    /// Publish an absolute boundary position, clamped to `[0.0, 1.0]`.
    pub fn set_boundary(&self, fraction: f32) {
        self.boundary.set(fraction);
    }

    /// Shift the boundary by a drag delta, saturating at the edges.
    pub fn drag_boundary(&self, delta: f32) {
        self.boundary.drag_by(delta);
    }

    /// The frame one side owes the viewer right now.
    pub fn due_position(&self, side: StreamSide) -> FramePosition {
        let clock = match side {
            StreamSide::Original => &self.original_clock,
            StreamSide::Processed => &self.processed_clock,
        };
        clock.due(self.epoch.elapsed())
    }

    /// Stops both playback loops and releases their decoders.
    pub async fn close(&self) {
        self.cancel.cancel();
        let handles: Vec<JoinHandle<()>> = {
            let mut players = self
                .players
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            players.drain(..).collect()
        };
        for handle in handles {
            match tokio::time::timeout(CLOSE_TIMEOUT, handle).await {
                Ok(Ok(())) => {}
                Ok(Err(err)) => warn!(error = %err, "Playback loop ended abnormally"),
                Err(_) => warn!("Timed out waiting for a playback loop to stop"),
            }
        }
        info!("Comparison session closed");
    }
}

// ---------------------------------------------------------------------------
// Playback loop
// ---------------------------------------------------------------------------

struct PlayerTask {
    adapter: Arc<dyn CodecAdapter>,
    source: MediaRef,
    side: StreamSide,
    clock: FrameClock,
    epoch: Instant,
    sink: Arc<dyn FrameSink>,
    cancel: CancellationToken,
}

/// Where the decoder stands relative to the schedule: the loop it
/// belongs to and the index it will yield next.
struct DecodeCursor {
    cycle: u64,
    next_index: u64,
}

fn run_player(task: PlayerTask) {
    let mut decoder = match task.adapter.open_decoder(&task.source) {
        Ok(decoder) => decoder,
        Err(err) => {
            error!(
                side = %task.side,
                source = %task.source,
                error = %err,
                "Playback loop could not open its stream"
            );
            return;
        }
    };
    let mut cursor = DecodeCursor {
        cycle: 0,
        next_index: 0,
    };
    let mut presented: Option<FramePosition> = None;

    info!(side = %task.side, source = %task.source, "Playback loop started");
    while !task.cancel.is_cancelled() {
        let due = task.clock.due(task.epoch.elapsed());
        if presented != Some(due) {
            if let Err(err) = present_due(&task, &mut decoder, &mut cursor, due) {
                error!(side = %task.side, error = %err, "Playback loop stopped on a stream error");
                return;
            }
            presented = Some(due);
        }
        let wait = task.clock.until_next(task.epoch.elapsed()).min(PLAYER_POLL);
        std::thread::sleep(wait);
    }
    info!(side = %task.side, "Playback loop stopped");
}

/// Decodes forward to the due frame and hands it to the sink. Frames
/// the schedule has already passed are decoded and discarded; a new
/// cycle reopens the stream from its first frame.
fn present_due(
    task: &PlayerTask,
    decoder: &mut Box<dyn FrameDecoder>,
    cursor: &mut DecodeCursor,
    due: FramePosition,
) -> Result<(), CodecError> {
    if cursor.cycle != due.cycle {
        *decoder = task.adapter.open_decoder(&task.source)?;
        cursor.cycle = due.cycle;
        cursor.next_index = 0;
    }

    let mut current: Option<Frame> = None;
    while cursor.next_index <= due.index {
        match decoder.next_frame()? {
            Some(frame) => {
                cursor.next_index += 1;
                current = Some(frame);
            }
            None => {
                warn!(
                    side = %task.side,
                    index = due.index,
                    "Stream ended before the due frame"
                );
                cursor.next_index = due.index + 1;
                break;
            }
        }
    }

    if let Some(frame) = current {
        task.sink.present(PresentedFrame {
            side: task.side,
            index: due.index,
            cycle: due.cycle,
            frame,
        });
    }
    Ok(())
}
