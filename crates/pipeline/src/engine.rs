//! Pairwise decode → synthesize → encode driver.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use frameloom_codec::adapter::{FrameDecoder, FrameEncoder};
use frameloom_codec::{CodecAdapter, EncoderParams, Frame, InterpolationBackend};
use frameloom_core::progress::{ProgressGate, DEFAULT_PROGRESS_INTERVAL};
use frameloom_core::{timeline, ErrorKind, Factor, MediaRef, PipelineError};

/// Receives gated progress samples from a run.
///
/// Values are in `[0.0, 1.0]` and non-decreasing within one run; the
/// terminal `1.0` is published exactly once, after the output is
/// finalized.
pub trait ProgressSink: Send + Sync {
    fn publish(&self, value: f32);
}

/// Drives one interpolation run end-to-end.
///
/// The engine holds only its collaborators; decode and encode handles
/// live inside a single `run` call and are released on every exit path.
pub struct InterpolationEngine {
    adapter: Arc<dyn CodecAdapter>,
    backend: Arc<dyn InterpolationBackend>,
    progress_interval: Duration,
}

impl InterpolationEngine {
    pub fn new(adapter: Arc<dyn CodecAdapter>, backend: Arc<dyn InterpolationBackend>) -> Self {
        Self {
            adapter,
            backend,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
        }
    }

    /// Override the minimum interval between progress publishes.
    pub fn with_progress_interval(mut self, interval: Duration) -> Self {
        self.progress_interval = interval;
        self
    }

    /// Run one interpolation job to completion.
    ///
    /// Returns the number of frames written. Cancellation is observed
    /// between pair-processing steps; on cancellation or any failure
    /// the partially written output is discarded before returning.
    pub fn run(
        &self,
        source: &MediaRef,
        factor: Factor,
        output: &MediaRef,
        progress: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<u64, PipelineError> {
        let mut decoder = self.adapter.open_decoder(source)?;
        let params = decoder.params().clone();
        let estimated_total = timeline::output_frame_count(params.frame_count, factor);

        let mut encoder = self
            .adapter
            .open_encoder(output, &EncoderParams::multiplied(&params, factor))?;

        info!(
            %source,
            %output,
            factor = %factor,
            backend = self.backend.name(),
            source_frames = params.frame_count,
            estimated_output_frames = estimated_total,
            "Starting interpolation run"
        );

        match self.drive(
            decoder.as_mut(),
            encoder.as_mut(),
            factor,
            estimated_total,
            progress,
            cancel,
        ) {
            Ok(written) => {
                encoder.finish()?;
                progress.publish(1.0);
                info!(%output, frames = written, "Interpolation run completed");
                Ok(written)
            }
            Err(err) => {
                encoder.abort();
                if err.kind == ErrorKind::Cancelled {
                    info!(%source, "Interpolation run cancelled");
                } else {
                    error!(%source, error = %err, "Interpolation run failed");
                }
                Err(err)
            }
        }
    }

    fn drive(
        &self,
        decoder: &mut dyn FrameDecoder,
        encoder: &mut dyn FrameEncoder,
        factor: Factor,
        estimated_total: u64,
        progress: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<u64, PipelineError> {
        let mut gate = ProgressGate::new(self.progress_interval);
        let mut written: u64 = 0;
        let mut previous: Option<Frame> = None;

        loop {
            if cancel.is_cancelled() {
                return Err(PipelineError::cancelled());
            }

            match decoder.next_frame()? {
                Some(frame) => {
                    if let Some(earlier) = previous.take() {
                        written += self.emit_pair(&earlier, &frame, factor, encoder)?;
                        if estimated_total > 0 {
                            let sample = written as f32 / estimated_total as f32;
                            if let Some(value) = gate.admit(Instant::now(), sample) {
                                progress.publish(value);
                                debug!(progress = value, frames = written, "Progress");
                            }
                        }
                    }
                    previous = Some(frame);
                }
                None => {
                    // The last real frame closes the sequence.
                    if let Some(last) = previous.take() {
                        encoder.write_frame(&last)?;
                        written += 1;
                    }
                    if written == 0 {
                        return Err(PipelineError::input("source contains no frames"));
                    }
                    return Ok(written);
                }
            }
        }
    }

    /// Emit the earlier frame of a pair plus its `N-1` synthesized
    /// frames. The later frame is emitted by the next step, or as the
    /// final frame of the run.
    fn emit_pair(
        &self,
        a: &Frame,
        b: &Frame,
        factor: Factor,
        encoder: &mut dyn FrameEncoder,
    ) -> Result<u64, PipelineError> {
        if b.pts_us <= a.pts_us {
            return Err(PipelineError::decode(format!(
                "source timestamps not increasing: {} then {}",
                a.pts_us, b.pts_us
            )));
        }

        encoder.write_frame(a)?;
        let mut emitted = 1;
        for (i, pts_us) in timeline::intermediate_timestamps(a.pts_us, b.pts_us, factor)
            .into_iter()
            .enumerate()
        {
            let weight = timeline::blend_weight(i as u32 + 1, factor);
            let data = self.backend.synthesize(a, b, weight)?;
            encoder.write_frame(&Frame { pts_us, data })?;
            emitted += 1;
        }
        Ok(emitted)
    }
}
