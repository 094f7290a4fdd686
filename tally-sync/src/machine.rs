//! Per-job status state machine
//!
//! Folds the snapshots of one job into a current status. Terminal statuses
//! are absorbing: once reached, later snapshots (stale polls, late pushes)
//! change nothing.

use tally_core::domain::job::{JobId, JobStatus, StatusSnapshot};

/// A change of status value for one job
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionEvent {
    pub from: JobStatus,
    pub to: JobStatus,
    /// The snapshot that caused the change
    pub snapshot: StatusSnapshot,
}

impl TransitionEvent {
    pub fn job_id(&self) -> JobId {
        self.snapshot.job_id
    }

    pub fn is_terminal(&self) -> bool {
        self.to.is_terminal()
    }
}

#[derive(Debug, Clone)]
pub struct JobStateMachine {
    job_id: JobId,
    status: JobStatus,
    current: Option<StatusSnapshot>,
}

impl JobStateMachine {
    pub fn new(job_id: JobId) -> Self {
        Self {
            job_id,
            status: JobStatus::Unknown,
            current: None,
        }
    }

    /// Apply a snapshot, returning an event when the status value changed
    pub fn apply(&mut self, snapshot: StatusSnapshot) -> Option<TransitionEvent> {
        if self.status.is_terminal() {
            tracing::trace!(job_id = %self.job_id, status = %snapshot.status, "Ignoring snapshot after terminal status");
            return None;
        }

        if snapshot.job_id != self.job_id {
            tracing::debug!(
                job_id = %self.job_id,
                other = %snapshot.job_id,
                "Ignoring snapshot for another job"
            );
            return None;
        }

        let from = self.status;
        let to = snapshot.status;
        self.status = to;
        self.current = Some(snapshot);

        if from == to {
            return None;
        }

        self.current.clone().map(|snapshot| TransitionEvent { from, to, snapshot })
    }

    pub fn job_id(&self) -> JobId {
        self.job_id
    }

    pub fn status(&self) -> JobStatus {
        self.status
    }

    /// Latest accepted snapshot
    pub fn snapshot(&self) -> Option<&StatusSnapshot> {
        self.current.as_ref()
    }

    /// Progress of the latest snapshot in whole percent, 0 before any
    pub fn progress(&self) -> u32 {
        self.current
            .as_ref()
            .map(StatusSnapshot::derived_progress)
            .unwrap_or(0)
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}
