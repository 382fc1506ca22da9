//! End-to-end lifecycle tests for [`JobManager`].
//!
//! These run real engine jobs over the in-memory codec adapter and
//! observe them only through the public surface: submission, status
//! snapshots, cancellation, and the event stream.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use tokio::sync::broadcast;

use frameloom_codec::{BlendBackend, FfmpegCodec, MemoryCodec, MemorySource};
use frameloom_core::{naming, ErrorKind, JobId, MediaRef};
use frameloom_jobs::{JobEvent, JobManager, JobManagerConfig, JobState};
use frameloom_pipeline::InterpolationEngine;

/// A source slow enough that a test can act while it is still running.
fn slow_source(frame_count: u64) -> MemorySource {
    let mut source = MemorySource::small(frame_count);
    source.frame_delay = Some(Duration::from_millis(5));
    source
}

fn manager_over(codec: &MemoryCodec, output_dir: &Path) -> Arc<JobManager> {
    let engine = InterpolationEngine::new(Arc::new(codec.clone()), Arc::new(BlendBackend))
        .with_progress_interval(Duration::ZERO);
    JobManager::start(
        Arc::new(engine),
        JobManagerConfig {
            output_dir: output_dir.to_path_buf(),
            ..JobManagerConfig::default()
        },
    )
}

async fn next_event(rx: &mut broadcast::Receiver<JobEvent>) -> JobEvent {
    tokio::time::timeout(Duration::from_secs(10), rx.recv())
        .await
        .expect("timed out waiting for a job event")
        .expect("event stream closed")
}

async fn terminal_event(rx: &mut broadcast::Receiver<JobEvent>, job_id: JobId) -> JobEvent {
    loop {
        let event = next_event(rx).await;
        if event.job_id() == job_id && event.is_terminal() {
            return event;
        }
    }
}

/// Waits until the job reports at least `threshold` progress.
async fn progress_reaching(
    rx: &mut broadcast::Receiver<JobEvent>,
    job_id: JobId,
    threshold: f32,
) -> f32 {
    loop {
        let event = next_event(rx).await;
        if event.job_id() != job_id {
            continue;
        }
        assert!(
            !event.is_terminal(),
            "job reached a terminal state before {threshold} progress"
        );
        if let JobEvent::Progress { progress, .. } = event {
            if progress >= threshold {
                return progress;
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Test: a 30-frame source at factor 4 completes with 117 output frames
// ---------------------------------------------------------------------------

#[tokio::test]
async fn completed_job_reports_the_multiplied_frame_count() {
    let codec = MemoryCodec::new();
    codec.register("clips/run.mp4", MemorySource::new(16, 16, 30.0, 30));
    let dir = tempfile::tempdir().expect("tempdir");
    let manager = manager_over(&codec, dir.path());
    let mut rx = manager.subscribe();

    let job_id = manager
        .submit(MediaRef::new("clips/run.mp4"), 4)
        .expect("submission accepted");
    let terminal = terminal_event(&mut rx, job_id).await;

    let (output, frames) = match terminal {
        JobEvent::Completed { output, frames, .. } => (output, frames),
        other => panic!("expected a completion event, got {other:?}"),
    };
    assert_eq!(frames, 117);

    // The file name follows the artifact convention.
    let file_name = output
        .as_path()
        .file_name()
        .and_then(|name| name.to_str())
        .expect("artifact has a file name");
    assert!(naming::parse_artifact_timestamp(file_name).is_some());

    let status = manager.status(job_id).expect("job is known");
    assert_eq!(status.state, JobState::Completed);
    assert_eq!(status.progress, 1.0);
    assert_eq!(status.output.as_ref(), Some(&output));
    assert!(status.error.is_none());
    assert!(status.started_at.is_some());
    assert!(status.completed_at.is_some());

    let clip = codec.output(&output).expect("artifact committed");
    assert_eq!(clip.frames.len(), 117);
    assert_eq!(clip.params.fps, 120.0);

    manager.shutdown().await;
}

// ---------------------------------------------------------------------------
// Test: factor 8 on a 10-frame source yields 73 output frames
// ---------------------------------------------------------------------------

#[tokio::test]
async fn factor_eight_multiplies_a_short_clip() {
    let codec = MemoryCodec::new();
    codec.register("clips/short.mp4", MemorySource::small(10));
    let dir = tempfile::tempdir().expect("tempdir");
    let manager = manager_over(&codec, dir.path());
    let mut rx = manager.subscribe();

    let job_id = manager
        .submit(MediaRef::new("clips/short.mp4"), 8)
        .expect("submission accepted");
    let terminal = terminal_event(&mut rx, job_id).await;

    assert_matches!(terminal, JobEvent::Completed { frames: 73, .. });

    manager.shutdown().await;
}

// ---------------------------------------------------------------------------
// Test: resubmitting an active source joins the existing job
// ---------------------------------------------------------------------------

/// While a source's job is queued or running, submitting the same
/// source again returns the existing id. Once that job is terminal, a
/// new submission creates a fresh job.
#[tokio::test]
async fn duplicate_submission_joins_the_active_job() {
    let codec = MemoryCodec::new();
    codec.register("clips/a.mp4", slow_source(40));
    codec.register("clips/b.mp4", slow_source(40));
    let dir = tempfile::tempdir().expect("tempdir");
    let manager = manager_over(&codec, dir.path());
    let mut rx = manager.subscribe();

    let id_a = manager
        .submit(MediaRef::new("clips/a.mp4"), 4)
        .expect("submission accepted");
    progress_reaching(&mut rx, id_a, 0.0).await;

    // Running duplicate.
    let again = manager
        .submit(MediaRef::new("clips/a.mp4"), 4)
        .expect("duplicate accepted");
    assert_eq!(again, id_a);

    // Queued duplicate: the single worker is busy with `a`.
    let id_b = manager
        .submit(MediaRef::new("clips/b.mp4"), 4)
        .expect("submission accepted");
    assert_eq!(manager.status(id_b).expect("known").state, JobState::Queued);
    let b_again = manager
        .submit(MediaRef::new("clips/b.mp4"), 4)
        .expect("duplicate accepted");
    assert_eq!(b_again, id_b);

    manager.cancel_job(id_a);
    manager.cancel_job(id_b);
    terminal_event(&mut rx, id_a).await;
    terminal_event(&mut rx, id_b).await;

    // The source is free again after its job went terminal.
    let fresh = manager
        .submit(MediaRef::new("clips/a.mp4"), 4)
        .expect("resubmission accepted");
    assert_ne!(fresh, id_a);

    manager.shutdown().await;
}

// ---------------------------------------------------------------------------
// Test: an unsupported factor is rejected before any job exists
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unsupported_factor_is_rejected_fast() {
    let codec = MemoryCodec::new();
    codec.register("clips/a.mp4", MemorySource::small(10));
    let dir = tempfile::tempdir().expect("tempdir");
    let manager = manager_over(&codec, dir.path());
    let mut rx = manager.subscribe();

    let err = manager
        .submit(MediaRef::new("clips/a.mp4"), 3)
        .expect_err("factor 3 is unsupported");
    assert_eq!(err.kind, ErrorKind::InvalidFactor);

    // No record and no events were produced.
    assert_matches!(
        rx.try_recv(),
        Err(broadcast::error::TryRecvError::Empty)
    );

    manager.shutdown().await;
}

// ---------------------------------------------------------------------------
// Test: cancelling a half-done job leaves no artifact behind
// ---------------------------------------------------------------------------

#[tokio::test]
async fn cancel_midway_discards_the_partial_output() {
    let codec = MemoryCodec::new();
    codec.register("clips/long.mp4", slow_source(40));
    let dir = tempfile::tempdir().expect("tempdir");
    let manager = manager_over(&codec, dir.path());
    let mut rx = manager.subscribe();

    let job_id = manager
        .submit(MediaRef::new("clips/long.mp4"), 4)
        .expect("submission accepted");
    let reached = progress_reaching(&mut rx, job_id, 0.5).await;
    manager.cancel_job(job_id);

    let terminal = terminal_event(&mut rx, job_id).await;
    assert_matches!(terminal, JobEvent::Cancelled { .. });

    let status = manager.status(job_id).expect("job is known");
    assert_eq!(status.state, JobState::Cancelled);
    assert!(status.output.is_none());
    assert!(status.error.is_none());
    assert!(status.progress >= reached);
    assert!(status.progress < 1.0);

    // Nothing was committed anywhere.
    assert_eq!(codec.output_count(), 0);

    manager.shutdown().await;
}

// ---------------------------------------------------------------------------
// Test: a missing toolchain fails the job, not the orchestrator
// ---------------------------------------------------------------------------

/// With unresolvable codec binaries every run fails as Unavailable, and
/// the orchestrator keeps accepting and dispatching work afterwards.
#[tokio::test]
async fn unavailable_backend_fails_the_job_and_the_orchestrator_survives() {
    let first = tempfile::NamedTempFile::new().expect("temp source");
    let second = tempfile::NamedTempFile::new().expect("temp source");
    let dir = tempfile::tempdir().expect("tempdir");

    let codec = FfmpegCodec::with_binaries(
        "frameloom-test-no-such-ffmpeg",
        "frameloom-test-no-such-ffprobe",
    );
    let engine = InterpolationEngine::new(Arc::new(codec), Arc::new(BlendBackend))
        .with_progress_interval(Duration::ZERO);
    let manager = JobManager::start(
        Arc::new(engine),
        JobManagerConfig {
            output_dir: dir.path().to_path_buf(),
            ..JobManagerConfig::default()
        },
    );
    let mut rx = manager.subscribe();

    let job_id = manager
        .submit(MediaRef::from(first.path()), 4)
        .expect("submission accepted");
    let terminal = terminal_event(&mut rx, job_id).await;
    assert_matches!(
        terminal,
        JobEvent::Failed {
            kind: ErrorKind::Unavailable,
            ..
        }
    );

    let status = manager.status(job_id).expect("job is known");
    assert_eq!(status.state, JobState::Failed);
    let error = status.error.expect("failure recorded on the job");
    assert_eq!(error.kind, ErrorKind::Unavailable);

    // The orchestrator is still dispatching.
    let next_id = manager
        .submit(MediaRef::from(second.path()), 4)
        .expect("submission accepted");
    let terminal = terminal_event(&mut rx, next_id).await;
    assert_matches!(
        terminal,
        JobEvent::Failed {
            kind: ErrorKind::Unavailable,
            ..
        }
    );

    manager.shutdown().await;
}

// ---------------------------------------------------------------------------
// Test: events arrive in lifecycle order with the terminal event last
// ---------------------------------------------------------------------------

#[tokio::test]
async fn events_arrive_in_lifecycle_order() {
    let codec = MemoryCodec::new();
    codec.register("clips/ordered.mp4", MemorySource::small(20));
    let dir = tempfile::tempdir().expect("tempdir");
    let manager = manager_over(&codec, dir.path());
    let mut rx = manager.subscribe();

    let job_id = manager
        .submit(MediaRef::new("clips/ordered.mp4"), 4)
        .expect("submission accepted");

    let mut events = Vec::new();
    loop {
        let event = next_event(&mut rx).await;
        if event.job_id() != job_id {
            continue;
        }
        let done = event.is_terminal();
        events.push(event);
        if done {
            break;
        }
    }

    assert_matches!(events.first(), Some(JobEvent::Queued { .. }));
    assert_matches!(events.get(1), Some(JobEvent::Started { .. }));
    assert_matches!(events.last(), Some(JobEvent::Completed { .. }));

    let samples: Vec<f32> = events
        .iter()
        .filter_map(|event| match event {
            JobEvent::Progress { progress, .. } => Some(*progress),
            _ => None,
        })
        .collect();
    assert!(!samples.is_empty());
    assert!(samples.windows(2).all(|pair| pair[0] <= pair[1]));
    assert_eq!(
        events.iter().filter(|event| event.is_terminal()).count(),
        1
    );

    manager.shutdown().await;
}

// ---------------------------------------------------------------------------
// Test: a single worker runs jobs one at a time
// ---------------------------------------------------------------------------

#[tokio::test]
async fn single_worker_keeps_the_second_job_queued() {
    let codec = MemoryCodec::new();
    codec.register("clips/first.mp4", slow_source(40));
    codec.register("clips/second.mp4", MemorySource::small(6));
    let dir = tempfile::tempdir().expect("tempdir");
    let manager = manager_over(&codec, dir.path());
    let mut rx = manager.subscribe();

    let first = manager
        .submit(MediaRef::new("clips/first.mp4"), 4)
        .expect("submission accepted");
    progress_reaching(&mut rx, first, 0.0).await;

    let second = manager
        .submit(MediaRef::new("clips/second.mp4"), 4)
        .expect("submission accepted");
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(
        manager.status(first).expect("known").state,
        JobState::Running
    );
    assert_eq!(
        manager.status(second).expect("known").state,
        JobState::Queued
    );

    // Freeing the slot lets the queued job run to completion.
    manager.cancel_job(first);
    assert_matches!(
        terminal_event(&mut rx, first).await,
        JobEvent::Cancelled { .. }
    );
    assert_matches!(
        terminal_event(&mut rx, second).await,
        JobEvent::Completed { frames: 21, .. }
    );

    manager.shutdown().await;
}

// ---------------------------------------------------------------------------
// Test: shutdown cancels running and queued jobs
// ---------------------------------------------------------------------------

#[tokio::test]
async fn shutdown_cancels_running_and_queued_jobs() {
    let codec = MemoryCodec::new();
    codec.register("clips/first.mp4", slow_source(40));
    codec.register("clips/second.mp4", slow_source(40));
    let dir = tempfile::tempdir().expect("tempdir");
    let manager = manager_over(&codec, dir.path());
    let mut rx = manager.subscribe();

    let first = manager
        .submit(MediaRef::new("clips/first.mp4"), 4)
        .expect("submission accepted");
    progress_reaching(&mut rx, first, 0.0).await;
    let second = manager
        .submit(MediaRef::new("clips/second.mp4"), 4)
        .expect("submission accepted");

    manager.shutdown().await;

    assert_eq!(
        manager.status(first).expect("known").state,
        JobState::Cancelled
    );
    assert_eq!(
        manager.status(second).expect("known").state,
        JobState::Cancelled
    );
    assert_eq!(codec.output_count(), 0);
}

// ---------------------------------------------------------------------------
// Test: cancel is a no-op on terminal and unknown jobs
// ---------------------------------------------------------------------------

#[tokio::test]
async fn cancel_is_a_noop_after_completion() {
    let codec = MemoryCodec::new();
    codec.register("clips/done.mp4", MemorySource::small(6));
    let dir = tempfile::tempdir().expect("tempdir");
    let manager = manager_over(&codec, dir.path());
    let mut rx = manager.subscribe();

    let job_id = manager
        .submit(MediaRef::new("clips/done.mp4"), 4)
        .expect("submission accepted");
    terminal_event(&mut rx, job_id).await;

    manager.cancel_job(job_id);
    manager.cancel_job(JobId::new_v4());

    let status = manager.status(job_id).expect("job is known");
    assert_eq!(status.state, JobState::Completed);
    assert!(status.output.is_some());

    manager.shutdown().await;
}
