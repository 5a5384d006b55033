//! Dispatcher that records messages instead of delivering them

use intake_protocol::NotificationMessage;
use std::sync::{Mutex, PoisonError};

use super::failure::{FailureConfig, FailureInjector, Operation};
use crate::collaborators::{CollaboratorError, MessageDispatcher};

#[derive(Debug, Default)]
pub struct RecordingDispatcher {
    sent: Mutex<Vec<NotificationMessage>>,
    failures: FailureInjector,
}

impl RecordingDispatcher {
    /// A dispatcher whose every call fails with `message`.
    pub fn failing(message: impl Into<String>) -> Self {
        let dispatcher = Self::default();
        dispatcher
            .failures
            .inject(Operation::Dispatch, FailureConfig::error(message));
        dispatcher
    }

    pub fn failures(&self) -> &FailureInjector {
        &self.failures
    }

    /// Messages accepted so far, oldest first.
    pub fn messages(&self) -> Vec<NotificationMessage> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl MessageDispatcher for RecordingDispatcher {
    fn dispatch(&self, message: &NotificationMessage) -> Result<(), CollaboratorError> {
        self.failures.check(Operation::Dispatch)?;
        self.sent
            .lock()
            .map_err(|_| CollaboratorError::new("message dispatcher", "lock poisoned"))?
            .push(message.clone());
        Ok(())
    }
}
