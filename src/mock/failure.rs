//! Failure injection for in-memory collaborators

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::collaborators::CollaboratorError;

/// Collaborator operations that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    GetJob,
    SaveJob,
    Dispatch,
    LookupSoftware,
}

impl Operation {
    fn collaborator(&self) -> &'static str {
        match self {
            Operation::GetJob | Operation::SaveJob => "job store",
            Operation::Dispatch => "message dispatcher",
            Operation::LookupSoftware => "software catalog",
        }
    }
}

/// Failure configuration for an operation
#[derive(Debug, Clone)]
pub struct FailureConfig {
    pub message: String,
    /// Number of times to fail before succeeding (None = always fail)
    pub fail_count: Option<u32>,
}

impl FailureConfig {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            fail_count: None,
        }
    }

    /// Set the number of times to fail before succeeding
    pub fn with_fail_count(mut self, count: u32) -> Self {
        self.fail_count = Some(count);
        self
    }
}

#[derive(Debug, Default)]
struct Injections {
    configs: HashMap<Operation, FailureConfig>,
    call_counts: HashMap<Operation, u32>,
}

/// Shared failure injector. Safe to use through `&self`.
#[derive(Debug, Default)]
pub struct FailureInjector {
    inner: Mutex<Injections>,
}

impl FailureInjector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recovers the tables from a poisoned lock.
    fn lock(&self) -> MutexGuard<'_, Injections> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn inject(&self, op: Operation, config: FailureConfig) {
        let mut inner = self.lock();
        inner.configs.insert(op, config);
        inner.call_counts.insert(op, 0);
    }

    pub fn inject_error(&self, op: Operation, message: impl Into<String>) {
        self.inject(op, FailureConfig::error(message));
    }

    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.configs.clear();
        inner.call_counts.clear();
    }

    /// Err when `op` should fail on this call.
    pub fn check(&self, op: Operation) -> Result<(), CollaboratorError> {
        let mut inner = self.lock();
        let Some(config) = inner.configs.get(&op).cloned() else {
            return Ok(());
        };

        let count = inner.call_counts.entry(op).or_insert(0);
        *count += 1;
        if let Some(limit) = config.fail_count {
            if *count > limit {
                return Ok(());
            }
        }
        Err(CollaboratorError::new(op.collaborator(), config.message))
    }
}
