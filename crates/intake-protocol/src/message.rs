//! Payload handed to the notification dispatcher.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One triggered notification.
///
/// Delivery (queueing, retries, placeholder expansion in the callback) is
/// the dispatcher's business; this only records what fired and for whom.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationMessage {
    /// Identity of the notification subscription that matched.
    pub notification_id: String,
    /// Job the event happened to.
    pub subject_id: String,
    pub owner: String,
    /// Triggering event name, upper-case.
    pub event: String,
    /// URL or email address to deliver to.
    pub callback_url: String,
    pub persistent: bool,
    pub created_at: DateTime<Utc>,
    /// Free-form context, e.g. the event description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<serde_json::Value>,
}

impl NotificationMessage {
    pub fn new(
        notification_id: impl Into<String>,
        subject_id: impl Into<String>,
        owner: impl Into<String>,
        event: impl Into<String>,
        callback_url: impl Into<String>,
    ) -> Self {
        Self {
            notification_id: notification_id.into(),
            subject_id: subject_id.into(),
            owner: owner.into(),
            event: event.into(),
            callback_url: callback_url.into(),
            persistent: false,
            created_at: Utc::now(),
            context: None,
        }
    }

    pub fn persistent(mut self, persistent: bool) -> Self {
        self.persistent = persistent;
        self
    }

    pub fn with_context(mut self, context: serde_json::Value) -> Self {
        self.context = Some(context);
        self
    }
}
