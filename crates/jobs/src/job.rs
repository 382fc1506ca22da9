//! Processing job records and their lifecycle state machine.

use std::fmt;

use serde::{Deserialize, Serialize};

use frameloom_core::{Factor, JobId, MediaRef, PipelineError, Timestamp};

/// Lifecycle of one processing job.
///
/// `Queued -> Running -> {Completed | Failed | Cancelled}`, plus the
/// shortcut `Queued -> Cancelled` for jobs cancelled before a worker
/// picked them up. Terminal states are final.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Queued,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl JobState {
    /// Whether the job has reached a final state.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobState::Completed | JobState::Failed | JobState::Cancelled
        )
    }

    /// Legality table for lifecycle moves. Everything not listed here,
    /// including any move out of a terminal state, is forbidden.
    pub fn can_transition(self, target: JobState) -> bool {
        use JobState::*;
        matches!(
            (self, target),
            (Queued, Running)
                | (Queued, Cancelled)
                | (Running, Completed)
                | (Running, Failed)
                | (Running, Cancelled)
        )
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            JobState::Queued => "queued",
            JobState::Running => "running",
            JobState::Completed => "completed",
            JobState::Failed => "failed",
            JobState::Cancelled => "cancelled",
        };
        write!(f, "{label}")
    }
}

/// One processing request, tracked from submission to its terminal
/// state.
///
/// The orchestrator owns the record; callers only ever see whole-record
/// clones of it, so a reader can never observe a half-applied update.
#[derive(Debug, Clone, Serialize)]
pub struct ProcessingJob {
    pub id: JobId,
    pub source: MediaRef,
    pub factor: Factor,
    pub state: JobState,
    /// Completed fraction in `[0.0, 1.0]`, non-decreasing while the
    /// job is running.
    pub progress: f32,
    /// Artifact location, present only once the job completed.
    pub output: Option<MediaRef>,
    /// Failure classification, present only once the job failed.
    pub error: Option<PipelineError>,
    pub created_at: Timestamp,
    pub started_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
}

impl ProcessingJob {
    pub fn new(id: JobId, source: MediaRef, factor: Factor) -> Self {
        Self {
            id,
            source,
            factor,
            state: JobState::Queued,
            progress: 0.0,
            output: None,
            error: None,
            created_at: chrono::Utc::now(),
            started_at: None,
            completed_at: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queued_can_run_or_cancel_only() {
        assert!(JobState::Queued.can_transition(JobState::Running));
        assert!(JobState::Queued.can_transition(JobState::Cancelled));
        assert!(!JobState::Queued.can_transition(JobState::Completed));
        assert!(!JobState::Queued.can_transition(JobState::Failed));
        assert!(!JobState::Queued.can_transition(JobState::Queued));
    }

    #[test]
    fn running_reaches_every_terminal_state() {
        assert!(JobState::Running.can_transition(JobState::Completed));
        assert!(JobState::Running.can_transition(JobState::Failed));
        assert!(JobState::Running.can_transition(JobState::Cancelled));
        assert!(!JobState::Running.can_transition(JobState::Queued));
    }

    #[test]
    fn terminal_states_are_final() {
        let all = [
            JobState::Queued,
            JobState::Running,
            JobState::Completed,
            JobState::Failed,
            JobState::Cancelled,
        ];
        for terminal in [JobState::Completed, JobState::Failed, JobState::Cancelled] {
            assert!(terminal.is_terminal());
            for target in all {
                assert!(!terminal.can_transition(target));
            }
        }
        assert!(!JobState::Queued.is_terminal());
        assert!(!JobState::Running.is_terminal());
    }

    #[test]
    fn state_serializes_snake_case() {
        let json = serde_json::to_string(&JobState::Running).unwrap();
        assert_eq!(json, "\"running\"");
    }

    #[test]
    fn new_job_starts_queued_with_empty_results() {
        let job = ProcessingJob::new(
            JobId::new_v4(),
            MediaRef::new("clips/a.mp4"),
            Factor::X4,
        );
        assert_eq!(job.state, JobState::Queued);
        assert_eq!(job.progress, 0.0);
        assert!(job.output.is_none());
        assert!(job.error.is_none());
        assert!(job.started_at.is_none());
        assert!(job.completed_at.is_none());
    }
}
