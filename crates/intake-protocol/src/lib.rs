//! Job intake wire types.
//!
//! Shapes exchanged with the collaborators around the intake core: the error
//! payload returned to requesters, the message handed to the notification
//! dispatcher, and the canonical digest used to key normalized requests.

pub mod digest;
pub mod error;
pub mod message;

pub use digest::{canonical_sha256, DigestError};
pub use error::{ErrorCode, ErrorPayload};
pub use message::NotificationMessage;

/// Event name that matches every job event.
pub const WILDCARD_EVENT: &str = "*";
