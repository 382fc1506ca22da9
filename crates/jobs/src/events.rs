//! Lifecycle events published by the job orchestrator.

use serde::Serialize;

use frameloom_core::{ErrorKind, JobId, MediaRef};

/// One lifecycle event for a processing job.
///
/// Events for a given job are published in lifecycle order, and the
/// terminal event is always the last one delivered for that job.
#[derive(Debug, Clone, Serialize)]
pub enum JobEvent {
    /// The submission was accepted and parked in the queue.
    Queued { job_id: JobId },

    /// A worker slot was acquired and the engine run began.
    Started { job_id: JobId },

    /// Progress update, non-decreasing per job.
    Progress { job_id: JobId, progress: f32 },

    /// The run finished and the artifact is in place.
    Completed {
        job_id: JobId,
        output: MediaRef,
        frames: u64,
    },

    /// The run failed; the job record carries the same classification.
    Failed {
        job_id: JobId,
        kind: ErrorKind,
        message: String,
    },

    /// The job stopped on request; no artifact was left behind.
    Cancelled { job_id: JobId },
}

impl JobEvent {
    /// The job this event belongs to.
    pub fn job_id(&self) -> JobId {
        match self {
            JobEvent::Queued { job_id }
            | JobEvent::Started { job_id }
            | JobEvent::Progress { job_id, .. }
            | JobEvent::Completed { job_id, .. }
            | JobEvent::Failed { job_id, .. }
            | JobEvent::Cancelled { job_id } => *job_id,
        }
    }

    /// Whether this is the final event for its job.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobEvent::Completed { .. } | JobEvent::Failed { .. } | JobEvent::Cancelled { .. }
        )
    }
}
