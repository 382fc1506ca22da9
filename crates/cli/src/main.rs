//! `frameloom` command line entry point.

use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use anyhow::Context;
use tokio::sync::broadcast;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use frameloom_codec::{BlendBackend, FfmpegCodec};
use frameloom_compare::{ComparisonSession, FrameSink, PresentedFrame, StreamSide};
use frameloom_core::{JobId, MediaRef};
use frameloom_jobs::{JobEvent, JobManager, JobManagerConfig};
use frameloom_pipeline::InterpolationEngine;

mod config;

use config::AppConfig;

const USAGE: &str = "\
frameloom: video frame multiplication

USAGE:
    frameloom process <input> <factor>
        Multiply a clip's frame count (factor 4 or 8) and write the
        artifact into the output directory.

    frameloom compare <original> <processed> [seconds]
        Play two clips side by side for a while (default 10 seconds).

    frameloom doctor
        Check the codec toolchain and print its status.

ENVIRONMENT:
    FRAMELOOM_WORKERS                concurrent jobs (default 1)
    FRAMELOOM_OUTPUT_DIR             artifact directory (default media)
    FRAMELOOM_FFMPEG                 ffmpeg binary (default ffmpeg)
    FRAMELOOM_FFPROBE                ffprobe binary (default ffprobe)
    FRAMELOOM_PROGRESS_INTERVAL_MS   progress update interval (default 200)
    RUST_LOG                         tracing filter
";

const DEFAULT_COMPARE_SECS: u64 = 10;

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "frameloom_cli=info,frameloom_jobs=info,frameloom_pipeline=info,\
                 frameloom_codec=info,frameloom_compare=info"
                    .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let result = match args.first().map(String::as_str) {
        Some("process") => run_process(&args[1..]).await,
        Some("compare") => run_compare(&args[1..]).await,
        Some("doctor") => run_doctor(),
        Some("help" | "--help" | "-h") => {
            println!("{USAGE}");
            Ok(ExitCode::SUCCESS)
        }
        _ => {
            eprintln!("{USAGE}");
            Ok(ExitCode::from(2))
        }
    };

    match result {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

// ---------------------------------------------------------------------------
// process
// ---------------------------------------------------------------------------

async fn run_process(args: &[String]) -> anyhow::Result<ExitCode> {
    let [input, factor] = args else {
        eprintln!("usage: frameloom process <input> <factor>");
        return Ok(ExitCode::from(2));
    };
    let factor: u32 = factor.parse().context("factor must be an integer")?;

    let config = AppConfig::from_env();
    tracing::info!(
        workers = config.workers,
        output_dir = %config.output_dir.display(),
        "Loaded configuration"
    );
    let codec = FfmpegCodec::with_binaries(&config.ffmpeg, &config.ffprobe);
    let engine = InterpolationEngine::new(Arc::new(codec), Arc::new(BlendBackend))
        .with_progress_interval(config.progress_interval);
    let manager = JobManager::start(
        Arc::new(engine),
        JobManagerConfig {
            workers: config.workers,
            output_dir: config.output_dir.clone(),
            ..JobManagerConfig::default()
        },
    );

    let mut events = manager.subscribe();
    let job_id = manager.submit(MediaRef::new(input.as_str()), factor)?;
    println!("job {job_id}");

    let code = tokio::select! {
        code = watch_job(&mut events, job_id) => code?,
        _ = tokio::signal::ctrl_c() => {
            eprintln!("interrupted, cancelling job");
            manager.cancel_job(job_id);
            watch_job(&mut events, job_id).await?
        }
    };

    manager.shutdown().await;
    Ok(code)
}

/// Follows one job's events to its terminal state.
async fn watch_job(
    events: &mut broadcast::Receiver<JobEvent>,
    job_id: JobId,
) -> anyhow::Result<ExitCode> {
    loop {
        let event = events.recv().await.context("event stream closed")?;
        if event.job_id() != job_id {
            continue;
        }
        match event {
            JobEvent::Progress { progress, .. } => {
                println!("progress {:>3.0}%", progress * 100.0);
            }
            JobEvent::Completed { output, frames, .. } => {
                println!("completed: {output} ({frames} frames)");
                return Ok(ExitCode::SUCCESS);
            }
            JobEvent::Failed { kind, message, .. } => {
                eprintln!("failed: {kind}: {message}");
                return Ok(ExitCode::FAILURE);
            }
            JobEvent::Cancelled { .. } => {
                eprintln!("cancelled");
                return Ok(ExitCode::FAILURE);
            }
            JobEvent::Queued { .. } | JobEvent::Started { .. } => {}
        }
    }
}

// ---------------------------------------------------------------------------
// compare
// ---------------------------------------------------------------------------

/// Counts presented frames per side.
#[derive(Default)]
struct CountingSink {
    original: AtomicU64,
    processed: AtomicU64,
}

impl FrameSink for CountingSink {
    fn present(&self, frame: PresentedFrame) {
        let counter = match frame.side {
            StreamSide::Original => &self.original,
            StreamSide::Processed => &self.processed,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

async fn run_compare(args: &[String]) -> anyhow::Result<ExitCode> {
    let (original, processed, seconds) = match args {
        [original, processed] => (original, processed, DEFAULT_COMPARE_SECS),
        [original, processed, seconds] => (
            original,
            processed,
            seconds.parse().context("seconds must be an integer")?,
        ),
        _ => {
            eprintln!("usage: frameloom compare <original> <processed> [seconds]");
            return Ok(ExitCode::from(2));
        }
    };

    let config = AppConfig::from_env();
    tracing::info!(ffmpeg = %config.ffmpeg, ffprobe = %config.ffprobe, "Loaded configuration");
    let codec = FfmpegCodec::with_binaries(&config.ffmpeg, &config.ffprobe);
    let sink = Arc::new(CountingSink::default());

    let session = ComparisonSession::open(
        Arc::new(codec),
        MediaRef::new(original.as_str()),
        MediaRef::new(processed.as_str()),
        Arc::clone(&sink) as Arc<dyn FrameSink>,
    )
    .await?;

    println!(
        "comparing for {seconds}s (boundary at {:.2})",
        session.boundary()
    );
    tokio::select! {
        _ = tokio::time::sleep(Duration::from_secs(seconds)) => {}
        _ = tokio::signal::ctrl_c() => eprintln!("interrupted"),
    }
    session.close().await;

    println!(
        "presented {} original / {} processed frames",
        sink.original.load(Ordering::Relaxed),
        sink.processed.load(Ordering::Relaxed),
    );
    Ok(ExitCode::SUCCESS)
}

// ---------------------------------------------------------------------------
// doctor
// ---------------------------------------------------------------------------

fn run_doctor() -> anyhow::Result<ExitCode> {
    let config = AppConfig::from_env();
    let codec = FfmpegCodec::with_binaries(&config.ffmpeg, &config.ffprobe);
    let status = codec.detect();
    println!("{}", serde_json::to_string_pretty(&status)?);
    Ok(if status.available {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
