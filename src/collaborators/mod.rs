//! Seams to the services around the intake core.
//!
//! Persistence, the software catalog, permission decisions and message
//! delivery all live elsewhere. The core only talks to them through these
//! traits, which are called synchronously and never retried here.

mod permissions;

pub use permissions::PrefixPermissions;

use intake_protocol::NotificationMessage;

use crate::catalog::Software;
use crate::job::Job;

/// Failure of an external collaborator.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{collaborator} failed: {message}")]
pub struct CollaboratorError {
    pub collaborator: &'static str,
    pub message: String,
}

impl CollaboratorError {
    pub fn new(collaborator: &'static str, message: impl Into<String>) -> Self {
        Self {
            collaborator,
            message: message.into(),
        }
    }
}

/// The permission service could not decide.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unable to verify permissions for {uri}: {message}")]
pub struct PermissionError {
    pub uri: String,
    pub message: String,
}

/// Looks up software definitions by id.
pub trait SoftwareCatalog {
    fn software(&self, id: &str) -> Result<Option<Software>, CollaboratorError>;
}

/// Decides whether a user may read a remote path.
pub trait PermissionChecker {
    fn can_read(
        &self,
        username: &str,
        internal_username: Option<&str>,
        uri: &str,
    ) -> Result<bool, PermissionError>;
}

/// Hands triggered notifications to the delivery service.
pub trait MessageDispatcher {
    fn dispatch(&self, message: &NotificationMessage) -> Result<(), CollaboratorError>;
}

/// Job persistence.
pub trait JobStore {
    fn get(&self, uuid: &str) -> Result<Option<Job>, CollaboratorError>;
    fn save(&self, job: &Job) -> Result<(), CollaboratorError>;
}
