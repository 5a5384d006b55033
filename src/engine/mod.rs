//! Job status engine
//!
//! Applies status changes, hides and restores to stored jobs. Every applied
//! change appends to the job's audit log, persists the job, and then hands
//! one message per matching notification to the dispatcher.
//!
//! Transitions are not validated here. Callers serialize calls per job.

use intake_protocol::NotificationMessage;
use tracing::{debug, info, warn};

use crate::collaborators::{CollaboratorError, JobStore, MessageDispatcher};
use crate::job::{Job, JobEvent};
use crate::state::{JobStatus, DELETED_EVENT, RESTORED_EVENT};

/// Appended to events recorded against a hidden job.
pub const HIDDEN_JOB_SUFFIX: &str = " Event will be ignored because job has been deleted.";

/// Description recorded when a running job is stopped by a hide.
pub const CANCELLED_BY_USER: &str = "Job cancelled by user.";

/// Status engine errors
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("No job found with id {0}")]
    JobNotFound(String),

    #[error("Failed to persist job: {0}")]
    Store(#[source] CollaboratorError),

    #[error("Failed to dispatch notification: {0}")]
    Dispatch(#[source] CollaboratorError),
}

/// Outcome of [`StatusEngine::update_status`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusUpdate {
    /// Status and description changed; notifications were offered.
    Applied,
    /// Same status and description as before; nothing recorded.
    Unchanged,
    /// Job is hidden; the event was logged but the status kept.
    Ignored,
}

pub struct StatusEngine<'a> {
    store: &'a dyn JobStore,
    dispatcher: &'a dyn MessageDispatcher,
}

impl<'a> StatusEngine<'a> {
    pub fn new(store: &'a dyn JobStore, dispatcher: &'a dyn MessageDispatcher) -> Self {
        Self { store, dispatcher }
    }

    /// Move `job` to `status`, describing the change with `message` or the
    /// status's canonical description.
    pub fn update_status(
        &self,
        job: &mut Job,
        status: JobStatus,
        message: Option<&str>,
    ) -> Result<StatusUpdate, EngineError> {
        let description = message.unwrap_or_else(|| status.description()).to_string();

        if status == job.status && description == job.description {
            debug!(job = %job.uuid, status = %status, "redundant status update");
            return Ok(StatusUpdate::Unchanged);
        }

        if !job.visible {
            let owner = job.owner.clone();
            job.push_event(JobEvent::new(
                status.name(),
                format!("{}{}", description, HIDDEN_JOB_SUFFIX),
                owner,
            ));
            self.save(job)?;
            info!(job = %job.uuid, status = %status, "status update on hidden job recorded");
            return Ok(StatusUpdate::Ignored);
        }

        job.status = status;
        job.description = description.clone();
        let owner = job.owner.clone();
        job.push_event(JobEvent::new(status.name(), description.clone(), owner));
        stamp_times(job, status);
        self.save(job)?;
        info!(job = %job.uuid, status = %status, "job status updated");

        self.notify(job, status.name(), &description)?;
        Ok(StatusUpdate::Applied)
    }

    /// Hide a job on behalf of `owner`, stopping it first when it is running.
    pub fn hide(&self, job_id: &str, owner: &str) -> Result<Job, EngineError> {
        let mut job = self.load(job_id)?;

        if job.status.is_running() {
            self.update_status(&mut job, JobStatus::Stopped, Some(CANCELLED_BY_USER))?;
        }

        let description = format!("Job was deleted by user {}.", owner);
        job.visible = false;
        job.push_event(JobEvent::new(DELETED_EVENT, description.clone(), owner));
        self.save(&job)?;
        info!(job = %job.uuid, owner = %owner, "job hidden");

        self.notify(&job, DELETED_EVENT, &description)?;
        Ok(job)
    }

    /// Make a hidden job visible again. Always records one event.
    pub fn restore(&self, job_id: &str, owner: &str) -> Result<Job, EngineError> {
        let mut job = self.load(job_id)?;

        let description = format!("Job was restored by {}", owner);
        job.visible = true;
        job.push_event(JobEvent::new(RESTORED_EVENT, description.clone(), owner));
        self.save(&job)?;
        info!(job = %job.uuid, owner = %owner, "job restored");

        self.notify(&job, RESTORED_EVENT, &description)?;
        Ok(job)
    }

    fn load(&self, job_id: &str) -> Result<Job, EngineError> {
        self.store
            .get(job_id)
            .map_err(EngineError::Store)?
            .ok_or_else(|| EngineError::JobNotFound(job_id.to_string()))
    }

    fn save(&self, job: &Job) -> Result<(), EngineError> {
        self.store.save(job).map_err(EngineError::Store)
    }

    fn notify(&self, job: &Job, event: &str, description: &str) -> Result<(), EngineError> {
        let messages: Vec<NotificationMessage> = job
            .matching_notifications(event)
            .map(|n| n.to_message(event, description))
            .collect();

        for message in &messages {
            if let Err(err) = self.dispatcher.dispatch(message) {
                warn!(
                    job = %job.uuid,
                    notification = %message.notification_id,
                    error = %err,
                    "notification dispatch failed"
                );
                return Err(EngineError::Dispatch(err));
            }
        }
        Ok(())
    }
}

fn stamp_times(job: &mut Job, status: JobStatus) {
    let now = job.last_updated;
    match status {
        JobStatus::Queued => {
            job.submit_time.get_or_insert(now);
        }
        JobStatus::Running => {
            job.start_time.get_or_insert(now);
        }
        s if s.is_finished() => {
            job.end_time.get_or_insert(now);
        }
        _ => {}
    }
}
