//! In-memory collaborators
//!
//! Stand-ins for persistence, the software catalog and message delivery,
//! used by tests and by the CLI. Failures can be injected per operation.

mod dispatcher;
mod failure;
mod store;

pub use dispatcher::RecordingDispatcher;
pub use failure::{FailureConfig, FailureInjector, Operation};
pub use store::{InMemoryJobStore, StaticCatalog};
