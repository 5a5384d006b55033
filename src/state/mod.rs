//! Job lifecycle statuses and event names.
//!
//! Statuses follow a job from acceptance (PENDING) through staging,
//! submission and execution to archiving and a terminal outcome. The
//! engine does not enforce transitions; [`JobStatus::can_transition_to`]
//! is an advisory helper for callers that want to.

mod job_status;

pub use job_status::{JobStatus, UnknownStatus};

/// Event names recorded in the job log that are not statuses.
pub const JOB_EVENTS: &[&str] = &[
    "CREATED",
    "DELETED",
    "RESTORED",
    "PERMISSION_GRANT",
    "PERMISSION_REVOKE",
];

/// Event recorded when a job is hidden.
pub const DELETED_EVENT: &str = "DELETED";

/// Event recorded when a hidden job is made visible again.
pub const RESTORED_EVENT: &str = "RESTORED";

/// Whether `name` (any case) is a status or event a notification may target.
///
/// The wildcard `*` is handled by callers.
pub fn is_known_event(name: &str) -> bool {
    let upper = name.trim().to_ascii_uppercase();
    JOB_EVENTS.contains(&upper.as_str()) || upper.parse::<JobStatus>().is_ok()
}
