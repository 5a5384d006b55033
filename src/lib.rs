//! Job intake - request validation and lifecycle core of a job service
//!
//! Turns loosely-typed job requests (inputs, parameters, notifications and
//! resource constraints) into normalized job records bound to a batch queue,
//! and applies status changes to stored jobs with their audit events and
//! notification side effects.

pub mod catalog;
pub mod collaborators;
pub mod config;
pub mod engine;
pub mod error;
pub mod inputs;
pub mod job;
pub mod mock;
pub mod notifications;
pub mod parameters;
pub mod pipeline;
pub mod resources;
pub mod selection;
pub mod state;

pub use catalog::{Software, SoftwareDefaults};
pub use config::IntakeConfig;
pub use engine::{EngineError, StatusEngine, StatusUpdate};
pub use error::JobProcessingError;
pub use intake_fields::{FieldKind, FieldSpec};
pub use intake_protocol::{ErrorCode, ErrorPayload, NotificationMessage};
pub use job::{Job, JobEvent, JobResources};
pub use pipeline::{JobSubmission, SubmissionPipeline};
pub use selection::{BatchQueue, ExecutionSystem};
pub use state::JobStatus;
