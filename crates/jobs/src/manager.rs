//! The job orchestrator.
//!
//! [`JobManager`] owns every processing request end-to-end:
//!
//! - idempotent submission with fail-fast factor validation,
//! - dispatch to a bounded pool of engine workers,
//! - progress ratcheting and event publication,
//! - cooperative cancellation,
//! - terminal bookkeeping and shutdown draining.
//!
//! Engine runs execute on the blocking pool so the async runtime stays
//! responsive. The registry lock is a `std` lock because it is shared
//! with those blocking threads; it is only ever held for short map
//! operations.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use tokio::sync::{broadcast, mpsc, Semaphore};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

use frameloom_core::{naming, ErrorKind, Factor, JobId, MediaRef, PipelineError};
use frameloom_pipeline::{InterpolationEngine, ProgressSink};

use crate::events::JobEvent;
use crate::job::{JobState, ProcessingJob};

/// Capacity of the job event channel.
pub const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// Where artifacts land when no directory is configured.
pub const DEFAULT_OUTPUT_DIR: &str = "media";

/// Orchestrator configuration.
#[derive(Debug, Clone)]
pub struct JobManagerConfig {
    /// Concurrent engine runs. One by default so a single run's frame
    /// buffers bound peak memory.
    pub workers: usize,
    /// Directory where finished artifacts land.
    pub output_dir: PathBuf,
    /// Capacity of the job event channel.
    pub event_capacity: usize,
    /// Bounded wait for in-flight runs during shutdown.
    pub shutdown_timeout: Duration,
}

impl Default for JobManagerConfig {
    fn default() -> Self {
        Self {
            workers: 1,
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            event_capacity: EVENT_CHANNEL_CAPACITY,
            shutdown_timeout: Duration::from_secs(5),
        }
    }
}

#[derive(Default)]
struct Registry {
    jobs: HashMap<JobId, ProcessingJob>,
    /// Idempotent-submission index: source locator -> active job.
    active_by_source: HashMap<String, JobId>,
    /// Cooperative stop signals for jobs that are not yet terminal.
    tokens: HashMap<JobId, CancellationToken>,
}

/// Orchestrates processing jobs over a shared interpolation engine.
pub struct JobManager {
    registry: Arc<RwLock<Registry>>,
    engine: Arc<InterpolationEngine>,
    config: JobManagerConfig,
    event_tx: broadcast::Sender<JobEvent>,
    queue_tx: mpsc::UnboundedSender<JobId>,
    slots: Arc<Semaphore>,
    cancel: CancellationToken,
    tracker: TaskTracker,
}

impl JobManager {
    /// Builds the orchestrator and starts its dispatcher task.
    pub fn start(engine: Arc<InterpolationEngine>, config: JobManagerConfig) -> Arc<Self> {
        if let Err(err) = std::fs::create_dir_all(&config.output_dir) {
            warn!(
                dir = %config.output_dir.display(),
                error = %err,
                "Could not create the output directory"
            );
        }

        let (event_tx, _) = broadcast::channel(config.event_capacity.max(1));
        let (queue_tx, queue_rx) = mpsc::unbounded_channel();

        let manager = Arc::new(Self {
            registry: Arc::new(RwLock::new(Registry::default())),
            engine,
            event_tx,
            queue_tx,
            slots: Arc::new(Semaphore::new(config.workers.max(1))),
            cancel: CancellationToken::new(),
            tracker: TaskTracker::new(),
            config,
        });

        let dispatcher = Arc::clone(&manager);
        tokio::spawn(dispatcher.dispatch_loop(queue_rx));

        manager
    }

    /// Submits a source for processing and returns the job id.
    ///
    /// Fails fast when the factor is unsupported. While a job for the
    /// same source is still queued or running, resubmission returns
    /// that job's id instead of creating a second one. Never blocks.
    pub fn submit(&self, source: MediaRef, factor: u32) -> Result<JobId, PipelineError> {
        let factor = Factor::try_from(factor)?;

        let job_id = {
            let mut registry = write_lock(&self.registry);
            if let Some(existing) = registry.active_by_source.get(source.as_str()) {
                let existing = *existing;
                info!(job_id = %existing, %source, "Submission joined the active job for this source");
                return Ok(existing);
            }
            let job = ProcessingJob::new(JobId::new_v4(), source.clone(), factor);
            let job_id = job.id;
            registry
                .active_by_source
                .insert(source.as_str().to_owned(), job_id);
            registry.tokens.insert(job_id, self.cancel.child_token());
            registry.jobs.insert(job_id, job);
            job_id
        };

        info!(%job_id, %source, %factor, "Job submitted");
        self.publish(JobEvent::Queued { job_id });
        if self.queue_tx.send(job_id).is_err() {
            warn!(%job_id, "Dispatcher is stopped; cancelling the submission");
            self.cancel_job(job_id);
        }
        Ok(job_id)
    }

    /// Snapshot of one job, or `None` for an unknown id.
    ///
    /// Clones the whole record under the lock, so the caller never
    /// observes a half-applied update. Never blocks on job execution.
    pub fn status(&self, job_id: JobId) -> Option<ProcessingJob> {
        read_lock(&self.registry).jobs.get(&job_id).cloned()
    }

    /// Requests cancellation of a job.
    ///
    /// A queued job is finalized immediately; a running job stops at
    /// the engine's next cancellation point and is finalized by its
    /// worker. In any terminal state this is a no-op.
    pub fn cancel_job(&self, job_id: JobId) {
        let mut registry = write_lock(&self.registry);
        let Some(state) = registry.jobs.get(&job_id).map(|job| job.state) else {
            warn!(%job_id, "Cancel requested for unknown job");
            return;
        };

        match state {
            JobState::Queued => {
                let source = registry.jobs.get(&job_id).map(|job| job.source.clone());
                if let Some(job) = registry.jobs.get_mut(&job_id) {
                    job.state = JobState::Cancelled;
                    job.completed_at = Some(chrono::Utc::now());
                }
                if let Some(source) = source {
                    registry.active_by_source.remove(source.as_str());
                }
                if let Some(token) = registry.tokens.remove(&job_id) {
                    token.cancel();
                }
                drop(registry);
                info!(%job_id, "Queued job cancelled before running");
                self.publish(JobEvent::Cancelled { job_id });
            }
            JobState::Running => {
                let token = registry.tokens.get(&job_id).cloned();
                drop(registry);
                if let Some(token) = token {
                    info!(%job_id, "Cancellation signalled to running job");
                    token.cancel();
                }
            }
            _ => {
                debug!(%job_id, %state, "Cancel is a no-op in a terminal state");
            }
        }
    }

    /// Subscribes to the lifecycle event stream.
    pub fn subscribe(&self) -> broadcast::Receiver<JobEvent> {
        self.event_tx.subscribe()
    }

    /// Cancels everything in flight and waits for workers to drain.
    pub async fn shutdown(&self) {
        info!("Shutting down job manager");
        self.cancel.cancel();

        let queued: Vec<JobId> = {
            let registry = read_lock(&self.registry);
            registry
                .jobs
                .values()
                .filter(|job| job.state == JobState::Queued)
                .map(|job| job.id)
                .collect()
        };
        for job_id in queued {
            self.cancel_job(job_id);
        }

        self.tracker.close();
        if tokio::time::timeout(self.config.shutdown_timeout, self.tracker.wait())
            .await
            .is_err()
        {
            warn!("Timed out waiting for running jobs to stop");
        }
        info!("Job manager shut down");
    }

    // ---- private helpers ----

    async fn dispatch_loop(self: Arc<Self>, mut queue_rx: mpsc::UnboundedReceiver<JobId>) {
        info!(workers = self.config.workers, "Job dispatcher started");
        loop {
            let job_id = tokio::select! {
                _ = self.cancel.cancelled() => break,
                received = queue_rx.recv() => match received {
                    Some(job_id) => job_id,
                    None => break,
                },
            };

            // A queued job turns Running exactly when a worker slot is
            // acquired, so the permit is taken before claiming.
            let permit = tokio::select! {
                _ = self.cancel.cancelled() => break,
                permit = Arc::clone(&self.slots).acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };

            let Some((source, factor, token)) = self.claim(job_id) else {
                continue;
            };

            let runner = Arc::clone(&self);
            self.tracker.spawn(async move {
                let _permit = permit;
                runner.run_job(job_id, source, factor, token).await;
            });
        }
        info!("Job dispatcher stopped");
    }

    /// Flips a queued job to Running and hands back what the worker
    /// needs. Jobs that went terminal while queued are skipped.
    fn claim(&self, job_id: JobId) -> Option<(MediaRef, Factor, CancellationToken)> {
        let mut registry = write_lock(&self.registry);
        let job = registry.jobs.get_mut(&job_id)?;
        if job.state != JobState::Queued {
            return None;
        }
        job.state = JobState::Running;
        job.started_at = Some(chrono::Utc::now());
        let source = job.source.clone();
        let factor = job.factor;
        let token = registry.tokens.get(&job_id).cloned().unwrap_or_default();
        Some((source, factor, token))
    }

    async fn run_job(
        &self,
        job_id: JobId,
        source: MediaRef,
        factor: Factor,
        token: CancellationToken,
    ) {
        info!(%job_id, %source, %factor, "Job started");
        self.publish(JobEvent::Started { job_id });

        let output = self.allocate_output();
        let engine = Arc::clone(&self.engine);
        let sink = ManagerSink {
            registry: Arc::clone(&self.registry),
            event_tx: self.event_tx.clone(),
            job_id,
        };

        let run_source = source.clone();
        let run_output = output.clone();
        let joined = tokio::task::spawn_blocking(move || {
            engine.run(&run_source, factor, &run_output, &sink, &token)
        })
        .await;

        let outcome = match joined {
            Ok(result) => result,
            Err(join_err) => Err(PipelineError::unknown(format!(
                "engine task aborted: {join_err}"
            ))),
        };

        self.finalize(job_id, &source, output, outcome);
    }

    /// Records the terminal state, then publishes the terminal event.
    /// The record write strictly precedes the event so that a
    /// subscriber reacting to the event always reads the final state.
    fn finalize(
        &self,
        job_id: JobId,
        source: &MediaRef,
        output: MediaRef,
        outcome: Result<u64, PipelineError>,
    ) {
        let event = {
            let mut registry = write_lock(&self.registry);
            registry.active_by_source.remove(source.as_str());
            registry.tokens.remove(&job_id);
            let Some(job) = registry.jobs.get_mut(&job_id) else {
                error!(%job_id, "Finished job is missing from the registry");
                return;
            };
            job.completed_at = Some(chrono::Utc::now());
            match outcome {
                Ok(frames) => {
                    job.state = JobState::Completed;
                    job.progress = 1.0;
                    job.output = Some(output.clone());
                    info!(%job_id, frames, output = %output, "Job completed");
                    JobEvent::Completed {
                        job_id,
                        output,
                        frames,
                    }
                }
                Err(err) if err.kind.is_cancellation() => {
                    job.state = JobState::Cancelled;
                    info!(%job_id, "Job cancelled");
                    JobEvent::Cancelled { job_id }
                }
                Err(err) => {
                    job.state = JobState::Failed;
                    if err.kind == ErrorKind::Unavailable {
                        warn!(%job_id, error = %err, "Processing backend unavailable");
                    } else {
                        error!(%job_id, error = %err, "Job failed");
                    }
                    let event = JobEvent::Failed {
                        job_id,
                        kind: err.kind,
                        message: err.message.clone(),
                    };
                    job.error = Some(err);
                    event
                }
            }
        };
        self.publish(event);
    }

    /// Reserves an artifact path in the output directory, named by the
    /// `VID_<millisecond-timestamp>.mp4` convention.
    fn allocate_output(&self) -> MediaRef {
        let file = naming::artifact_file_name(chrono::Utc::now().timestamp_millis());
        MediaRef::from(self.config.output_dir.join(file))
    }

    fn publish(&self, event: JobEvent) {
        // No subscribers is normal; the send error is dropped.
        let _ = self.event_tx.send(event);
    }
}

/// Progress seam between a blocking engine run and the orchestrator:
/// ratchets the owning record's progress and republishes the ratcheted
/// value to subscribers.
struct ManagerSink {
    registry: Arc<RwLock<Registry>>,
    event_tx: broadcast::Sender<JobEvent>,
    job_id: JobId,
}

impl ProgressSink for ManagerSink {
    fn publish(&self, value: f32) {
        let ratcheted = {
            let mut registry = write_lock(&self.registry);
            match registry.jobs.get_mut(&self.job_id) {
                Some(job) if job.state == JobState::Running => {
                    job.progress = job.progress.max(value.clamp(0.0, 1.0));
                    Some(job.progress)
                }
                _ => None,
            }
        };
        if let Some(progress) = ratcheted {
            let _ = self.event_tx.send(JobEvent::Progress {
                job_id: self.job_id,
                progress,
            });
        }
    }
}

fn read_lock(lock: &RwLock<Registry>) -> RwLockReadGuard<'_, Registry> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write_lock(lock: &RwLock<Registry>) -> RwLockWriteGuard<'_, Registry> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}
