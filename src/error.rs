//! Request processing errors.
//!
//! Every processor failure converts into [`JobProcessingError`], which maps
//! onto a protocol [`ErrorCode`] and a serializable [`ErrorPayload`].

use intake_fields::FieldError;
use intake_protocol::{DigestError, ErrorCode, ErrorPayload};
use serde_json::json;

use crate::collaborators::{CollaboratorError, PermissionError};
use crate::notifications::NotificationError;
use crate::resources::ResourceError;
use crate::selection::SelectionError;

/// Why a job request was rejected.
#[derive(Debug, thiserror::Error)]
pub enum JobProcessingError {
    #[error(transparent)]
    Field(#[from] FieldError),

    #[error("Invalid value, '{value}', for {key}. {reason}")]
    InvalidInput {
        key: String,
        value: String,
        reason: String,
    },

    #[error("You do not have permission to access this the input file or directory at {uri}")]
    PermissionDenied { key: String, uri: String },

    #[error("Invalid value for {key}. {source}")]
    PermissionCheck {
        key: String,
        #[source]
        source: PermissionError,
    },

    #[error("Invalid notifications. {0}")]
    Notification(#[from] NotificationError),

    #[error(transparent)]
    Resource(#[from] ResourceError),

    #[error(transparent)]
    Selection(#[from] SelectionError),

    #[error("No software found matching {0}")]
    UnknownSoftware(String),

    #[error("{software} runs on execution system {expected}, not {system}")]
    SystemMismatch {
        software: String,
        expected: String,
        system: String,
    },

    #[error("Unable to process job request. {0}")]
    Collaborator(#[from] CollaboratorError),

    #[error("Unable to compute request key: {0}")]
    Digest(#[from] DigestError),
}

impl JobProcessingError {
    /// Protocol error code for this failure.
    pub fn code(&self) -> ErrorCode {
        match self {
            JobProcessingError::Field(_)
            | JobProcessingError::InvalidInput { .. }
            | JobProcessingError::PermissionCheck { .. }
            | JobProcessingError::Notification(_)
            | JobProcessingError::UnknownSoftware(_)
            | JobProcessingError::SystemMismatch { .. } => ErrorCode::InvalidRequest,
            JobProcessingError::PermissionDenied { .. } => ErrorCode::PermissionDenied,
            JobProcessingError::Resource(_) => ErrorCode::InvalidResource,
            JobProcessingError::Selection(err) => match err {
                SelectionError::NoMatchingQueue { .. } => ErrorCode::NoMatchingQueue,
                SelectionError::UnknownQueue { .. } | SelectionError::UnknownDefaultQueue { .. } => {
                    ErrorCode::InvalidRequest
                }
                _ => ErrorCode::InvalidResource,
            },
            JobProcessingError::Collaborator(_) | JobProcessingError::Digest(_) => {
                ErrorCode::ProcessingFailed
            }
        }
    }

    pub fn http_status(&self) -> u16 {
        self.code().http_status()
    }

    /// Request key the failure is attributed to, when there is one.
    pub fn key(&self) -> Option<&str> {
        match self {
            JobProcessingError::Field(err) => Some(err.key()),
            JobProcessingError::InvalidInput { key, .. }
            | JobProcessingError::PermissionDenied { key, .. }
            | JobProcessingError::PermissionCheck { key, .. } => Some(key),
            JobProcessingError::Notification(_) => Some("notifications"),
            _ => None,
        }
    }

    pub fn to_payload(&self) -> ErrorPayload {
        let message = self.to_string();
        match self.key() {
            Some(key) => ErrorPayload::with_data(self.code(), message, json!({ "field": key })),
            None => ErrorPayload::new(self.code(), message),
        }
    }
}
