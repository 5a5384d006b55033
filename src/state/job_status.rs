//! Job status enumeration

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Job status enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Pending,
    ProcessingInputs,
    StagingInputs,
    Staged,
    StagingJob,
    Submitting,
    Queued,
    Running,
    Paused,
    CleaningUp,
    Archiving,
    ArchivingFinished,
    ArchivingFailed,
    Finished,
    Killed,
    Stopped,
    Failed,
    /// Liveness ping from the execution side; never a lasting status.
    Heartbeat,
}

/// Name that is not a job status.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown job status: {0}")]
pub struct UnknownStatus(pub String);

impl JobStatus {
    /// Every status, in lifecycle order.
    pub const ALL: [JobStatus; 18] = [
        JobStatus::Pending,
        JobStatus::ProcessingInputs,
        JobStatus::StagingInputs,
        JobStatus::Staged,
        JobStatus::StagingJob,
        JobStatus::Submitting,
        JobStatus::Queued,
        JobStatus::Running,
        JobStatus::Paused,
        JobStatus::CleaningUp,
        JobStatus::Archiving,
        JobStatus::ArchivingFinished,
        JobStatus::ArchivingFailed,
        JobStatus::Finished,
        JobStatus::Killed,
        JobStatus::Stopped,
        JobStatus::Failed,
        JobStatus::Heartbeat,
    ];

    /// Upper-case wire name.
    pub fn name(&self) -> &'static str {
        match self {
            JobStatus::Pending => "PENDING",
            JobStatus::ProcessingInputs => "PROCESSING_INPUTS",
            JobStatus::StagingInputs => "STAGING_INPUTS",
            JobStatus::Staged => "STAGED",
            JobStatus::StagingJob => "STAGING_JOB",
            JobStatus::Submitting => "SUBMITTING",
            JobStatus::Queued => "QUEUED",
            JobStatus::Running => "RUNNING",
            JobStatus::Paused => "PAUSED",
            JobStatus::CleaningUp => "CLEANING_UP",
            JobStatus::Archiving => "ARCHIVING",
            JobStatus::ArchivingFinished => "ARCHIVING_FINISHED",
            JobStatus::ArchivingFailed => "ARCHIVING_FAILED",
            JobStatus::Finished => "FINISHED",
            JobStatus::Killed => "KILLED",
            JobStatus::Stopped => "STOPPED",
            JobStatus::Failed => "FAILED",
            JobStatus::Heartbeat => "HEARTBEAT",
        }
    }

    /// Canonical description recorded when no custom message is given.
    pub fn description(&self) -> &'static str {
        match self {
            JobStatus::Pending => "Job accepted and queued for submission.",
            JobStatus::ProcessingInputs => "Identifying input files for staging",
            JobStatus::StagingInputs => "Transferring job input data to execution system",
            JobStatus::Staged => "Job inputs staged to execution system",
            JobStatus::StagingJob => "Staging runtime assets to execution system",
            JobStatus::Submitting => {
                "Preparing job for execution and staging assets to execution system"
            }
            JobStatus::Queued => "Job successfully placed into queue",
            JobStatus::Running => "Job started running",
            JobStatus::Paused => "Job execution paused by user",
            JobStatus::CleaningUp => "Job completed execution",
            JobStatus::Archiving => "Transferring job output to archive system",
            JobStatus::ArchivingFinished => "Job archiving complete",
            JobStatus::ArchivingFailed => "Job archiving failed",
            JobStatus::Finished => "Job complete",
            JobStatus::Killed => "Job execution killed at user request",
            JobStatus::Stopped => "Job execution intentionally stopped",
            JobStatus::Failed => "Job failed",
            JobStatus::Heartbeat => "Job heartbeat received",
        }
    }

    /// Statuses in which the job still holds work in flight.
    pub fn is_running(&self) -> bool {
        matches!(
            self,
            JobStatus::Pending
                | JobStatus::StagingInputs
                | JobStatus::StagingJob
                | JobStatus::Running
                | JobStatus::Paused
                | JobStatus::Queued
                | JobStatus::Submitting
                | JobStatus::ProcessingInputs
                | JobStatus::Staged
                | JobStatus::CleaningUp
        )
    }

    pub fn is_finished(&self) -> bool {
        matches!(
            self,
            JobStatus::Finished | JobStatus::Killed | JobStatus::Failed | JobStatus::Stopped
        )
    }

    pub fn is_submitting(&self) -> bool {
        matches!(
            self,
            JobStatus::StagingJob | JobStatus::Submitting | JobStatus::Staged
        )
    }

    /// Whether the job has reached the execution system's queue.
    pub fn has_queued(&self) -> bool {
        !matches!(
            self,
            JobStatus::Pending
                | JobStatus::StagingInputs
                | JobStatus::StagingJob
                | JobStatus::Submitting
                | JobStatus::Staged
        )
    }

    pub fn is_archived(&self) -> bool {
        matches!(self, JobStatus::ArchivingFailed | JobStatus::ArchivingFinished)
    }

    pub fn is_failed(&self) -> bool {
        matches!(
            self,
            JobStatus::ArchivingFailed | JobStatus::Failed | JobStatus::Killed
        )
    }

    pub fn is_executing(&self) -> bool {
        matches!(self, JobStatus::Running | JobStatus::Paused | JobStatus::Queued)
    }

    /// Statuses reachable from this one in the ideal lifecycle.
    pub fn next_valid_states(&self) -> Vec<JobStatus> {
        use JobStatus::*;
        match self {
            Pending => vec![Pending, ProcessingInputs, Stopped, Paused, Failed],
            ProcessingInputs => vec![ProcessingInputs, StagingInputs, Stopped, Paused, Failed],
            StagingInputs => vec![StagingInputs, Staged, Stopped, Paused, Failed],
            Staged => vec![Staged, Submitting, Stopped, Paused, Failed],
            StagingJob => vec![StagingJob, Submitting, Stopped, Paused, Failed],
            Submitting => vec![
                Submitting, Queued, Running, Killed, Stopped, Paused, Failed, Heartbeat,
            ],
            Queued => vec![
                Queued, Running, CleaningUp, Killed, Stopped, Paused, Failed, Heartbeat,
            ],
            Running => vec![
                Running, Queued, CleaningUp, Killed, Stopped, Paused, Failed, Heartbeat,
            ],
            CleaningUp => vec![CleaningUp, Archiving, Finished, Killed, Stopped, Paused, Failed],
            Archiving => vec![
                Archiving,
                ArchivingFailed,
                ArchivingFinished,
                Killed,
                Stopped,
                Paused,
                Failed,
            ],
            ArchivingFailed => vec![ArchivingFailed, Failed],
            ArchivingFinished => vec![ArchivingFinished, Failed, Finished],
            Paused | Heartbeat => JobStatus::ALL.to_vec(),
            Finished | Killed | Stopped | Failed => Vec::new(),
        }
    }

    /// Check if transition from this status to target is expected.
    ///
    /// Advisory only: the status engine accepts any transition.
    pub fn can_transition_to(&self, target: JobStatus) -> bool {
        self.next_valid_states().contains(&target)
    }

    /// The status that logically precedes this one.
    ///
    /// Statuses without a well-defined predecessor (paused and the terminal
    /// ones) fall back to PENDING.
    pub fn previous_state(&self) -> JobStatus {
        use JobStatus::*;
        match self {
            Pending | ProcessingInputs => Pending,
            StagingInputs => ProcessingInputs,
            Staged => StagingInputs,
            StagingJob => Staged,
            Submitting => StagingJob,
            Queued => Submitting,
            Running => Queued,
            CleaningUp => Running,
            Archiving => CleaningUp,
            ArchivingFailed | ArchivingFinished => Archiving,
            Paused | Killed | Stopped | Finished | Failed | Heartbeat => Pending,
        }
    }

    /// The status a job is reset to when its current phase is retried.
    pub fn rollback_state(&self) -> JobStatus {
        use JobStatus::*;
        match self {
            Pending | ProcessingInputs | StagingInputs | Staged => Pending,
            StagingJob | Submitting | Queued | Running | CleaningUp => Staged,
            Archiving | ArchivingFailed | ArchivingFinished => CleaningUp,
            Paused | Killed | Stopped | Finished | Failed | Heartbeat => Pending,
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for JobStatus {
    type Err = UnknownStatus;

    /// Case-insensitive parse of a status name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        JobStatus::ALL
            .iter()
            .copied()
            .find(|status| status.name() == upper)
            .ok_or_else(|| UnknownStatus(s.to_string()))
    }
}
