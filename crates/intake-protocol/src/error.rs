//! Error codes returned to job requesters.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Error codes attached to rejected or failed requests.
///
/// These codes are stable and used for automation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// A field, notification or resource value broke a request rule.
    InvalidRequest,
    /// The requester may not read one of the referenced inputs.
    PermissionDenied,
    /// A resource value is malformed or exceeds the selected queue.
    InvalidResource,
    /// No queue on the execution system can hold the request.
    NoMatchingQueue,
    /// A collaborator failed; the request itself may be fine.
    ProcessingFailed,
}

impl ErrorCode {
    /// HTTP status a front end should answer with.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::InvalidRequest | Self::InvalidResource | Self::NoMatchingQueue => 400,
            Self::PermissionDenied => 403,
            Self::ProcessingFailed => 500,
        }
    }

    /// Whether the requester caused the failure.
    pub fn is_client_error(&self) -> bool {
        self.http_status() < 500
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidRequest => write!(f, "INVALID_REQUEST"),
            Self::PermissionDenied => write!(f, "PERMISSION_DENIED"),
            Self::InvalidResource => write!(f, "INVALID_RESOURCE"),
            Self::NoMatchingQueue => write!(f, "NO_MATCHING_QUEUE"),
            Self::ProcessingFailed => write!(f, "PROCESSING_FAILED"),
        }
    }
}

/// Error body returned for a rejected request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub code: ErrorCode,
    /// Human-readable, single-line message.
    pub message: String,
    /// Optional machine-readable details (failing field, limits).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl ErrorPayload {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    pub fn with_data(code: ErrorCode, message: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            code,
            message: message.into(),
            data: Some(data),
        }
    }

    /// Create an INVALID_REQUEST error naming the failing field.
    pub fn invalid_field(key: &str, message: impl Into<String>) -> Self {
        Self::with_data(
            ErrorCode::InvalidRequest,
            message,
            serde_json::json!({ "field": key }),
        )
    }

    /// Create a NO_MATCHING_QUEUE error for the given system.
    pub fn no_matching_queue(system: &str) -> Self {
        Self::with_data(
            ErrorCode::NoMatchingQueue,
            format!("no queue on {} satisfies the requested resources", system),
            serde_json::json!({ "system": system }),
        )
    }

    pub fn http_status(&self) -> u16 {
        self.code.http_status()
    }
}

impl fmt::Display for ErrorPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for ErrorPayload {}
