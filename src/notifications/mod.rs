//! Notification subscriptions attached to a job request.
//!
//! A request may carry nothing, a single callback target (URL or email), or
//! an array of `{url, event, persistent}` objects. Processing is atomic: one
//! bad element rejects the whole batch.

use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use intake_protocol::{NotificationMessage, WILDCARD_EVENT};
use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use crate::state::{is_known_event, JobStatus};

/// Events a bare callback string subscribes to.
pub const DEFAULT_CALLBACK_EVENTS: [JobStatus; 3] =
    [JobStatus::Finished, JobStatus::Failed, JobStatus::Stopped];

const URL_PATTERN: &str =
    r"^https?://([^\s/@]+@)?[A-Za-z0-9]([A-Za-z0-9-]*[A-Za-z0-9])?(\.[A-Za-z0-9]([A-Za-z0-9-]*[A-Za-z0-9])?)*(:[0-9]{1,5})?([/?#]\S*)?$";

const EMAIL_PATTERN: &str =
    r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9]([A-Za-z0-9-]*[A-Za-z0-9])?(\.[A-Za-z0-9]([A-Za-z0-9-]*[A-Za-z0-9])?)+$";

/// Errors for notification processing
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NotificationError {
    #[error("Invalid notification callback '{0}'. Callbacks must be a valid http(s) URL or email address.")]
    InvalidCallback(String),

    #[error("Invalid notifications[{index}] value given. Each notification object should specify a valid url, event, and an optional boolean persistence attribute.")]
    NotAnObject { index: usize },

    #[error("notifications[{index}] is missing a url")]
    MissingUrl { index: usize },

    #[error("notifications[{index}] is missing an event")]
    MissingEvent { index: usize },

    #[error("notifications[{index}] has an invalid event '{event}'. Valid events are job statuses, job events, or *.")]
    UnknownEvent { index: usize, event: String },

    #[error("notifications[{index}] persistent must be a boolean")]
    InvalidPersistent { index: usize },

    #[error("Invalid notification value given. notifications must be an array of notification objects specifying a valid url, event, and an optional boolean persistence attribute.")]
    UnsupportedShape,
}

/// A job event subscription.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub uuid: String,
    pub owner: String,
    /// Job this subscription belongs to.
    pub subject_uuid: String,
    /// Upper-case status or event name, or `*`.
    pub event: String,
    pub callback_url: String,
    #[serde(default)]
    pub persistent: bool,
    #[serde(default = "default_active")]
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

fn default_active() -> bool {
    true
}

impl Notification {
    pub fn new(
        subject_uuid: impl Into<String>,
        owner: impl Into<String>,
        event: &str,
        callback_url: impl Into<String>,
        persistent: bool,
    ) -> Self {
        Self {
            uuid: Uuid::new_v4().to_string(),
            owner: owner.into(),
            subject_uuid: subject_uuid.into(),
            event: event.trim().to_ascii_uppercase(),
            callback_url: callback_url.into(),
            persistent,
            active: true,
            created_at: Utc::now(),
        }
    }

    /// Whether this subscription fires for `event` (case-insensitive).
    pub fn matches_event(&self, event: &str) -> bool {
        self.event == WILDCARD_EVENT || self.event.eq_ignore_ascii_case(event)
    }

    /// Dispatch payload for a firing of this subscription.
    pub fn to_message(&self, event: &str, description: &str) -> NotificationMessage {
        NotificationMessage::new(
            &self.uuid,
            &self.subject_uuid,
            &self.owner,
            event.to_ascii_uppercase(),
            &self.callback_url,
        )
        .persistent(self.persistent)
        .with_context(serde_json::json!({ "description": description }))
    }
}

fn url_regex() -> &'static Regex {
    static URL_RE: OnceLock<Regex> = OnceLock::new();
    URL_RE.get_or_init(|| Regex::new(URL_PATTERN).expect("URL_PATTERN is a valid regex"))
}

fn email_regex() -> &'static Regex {
    static EMAIL_RE: OnceLock<Regex> = OnceLock::new();
    EMAIL_RE.get_or_init(|| Regex::new(EMAIL_PATTERN).expect("EMAIL_PATTERN is a valid regex"))
}

/// http(s) URL, optionally with userinfo and `${...}` placeholders.
pub fn is_valid_url(value: &str) -> bool {
    url_regex().is_match(value)
}

pub fn is_valid_email(value: &str) -> bool {
    email_regex().is_match(value)
}

/// A callback target is either a URL or an email address.
pub fn is_valid_callback(value: &str) -> bool {
    let value = value.trim();
    is_valid_url(value) || is_valid_email(value)
}

/// Builds the notifications requested for one job.
#[derive(Debug, Clone)]
pub struct NotificationProcessor {
    owner: String,
    job_uuid: String,
}

impl NotificationProcessor {
    pub fn new(owner: impl Into<String>, job_uuid: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            job_uuid: job_uuid.into(),
        }
    }

    /// Process the raw `notifications` value of a request.
    pub fn process(&self, raw: Option<&Value>) -> Result<Vec<Notification>, NotificationError> {
        let notifications = match raw {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::String(callback)) => self.process_callback(callback)?,
            Some(Value::Array(items)) => self.process_array(items)?,
            Some(_) => return Err(NotificationError::UnsupportedShape),
        };

        debug!(
            job = %self.job_uuid,
            count = notifications.len(),
            "processed notifications"
        );
        Ok(notifications)
    }

    /// A bare callback subscribes to the terminal outcomes.
    pub fn process_callback(&self, callback: &str) -> Result<Vec<Notification>, NotificationError> {
        let callback = callback.trim();
        if callback.is_empty() {
            return Ok(Vec::new());
        }
        if !is_valid_callback(callback) {
            return Err(NotificationError::InvalidCallback(callback.to_string()));
        }

        Ok(DEFAULT_CALLBACK_EVENTS
            .iter()
            .map(|status| {
                Notification::new(&self.job_uuid, &self.owner, status.name(), callback, false)
            })
            .collect())
    }

    fn process_array(&self, items: &[Value]) -> Result<Vec<Notification>, NotificationError> {
        items
            .iter()
            .enumerate()
            .map(|(index, item)| self.process_element(index, item))
            .collect()
    }

    fn process_element(&self, index: usize, item: &Value) -> Result<Notification, NotificationError> {
        let Value::Object(obj) = item else {
            return Err(NotificationError::NotAnObject { index });
        };

        let url = match obj.get("url") {
            Some(Value::String(url)) if !url.trim().is_empty() => url.trim(),
            _ => return Err(NotificationError::MissingUrl { index }),
        };
        if !is_valid_callback(url) {
            return Err(NotificationError::InvalidCallback(url.to_string()));
        }

        let event = match obj.get("event") {
            Some(Value::String(event)) if !event.trim().is_empty() => event.trim(),
            _ => return Err(NotificationError::MissingEvent { index }),
        };
        if event != WILDCARD_EVENT && !is_known_event(event) {
            return Err(NotificationError::UnknownEvent {
                index,
                event: event.to_string(),
            });
        }

        let persistent = match obj.get("persistent") {
            None | Some(Value::Null) => false,
            Some(Value::Bool(b)) => *b,
            Some(_) => return Err(NotificationError::InvalidPersistent { index }),
        };

        Ok(Notification::new(&self.job_uuid, &self.owner, event, url, persistent))
    }
}
