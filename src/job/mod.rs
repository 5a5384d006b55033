//! Job aggregate and its audit log
//!
//! A `Job` is the normalized record produced from an accepted request. Its
//! event log is append-only; only the status engine adds to it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::notifications::Notification;
use crate::resources::RunTime;
use crate::state::JobStatus;

/// One entry in a job's audit log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobEvent {
    /// Status or event name (`RUNNING`, `DELETED`, ...).
    pub event: String,
    pub description: String,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

impl JobEvent {
    pub fn new(
        event: impl Into<String>,
        description: impl Into<String>,
        created_by: impl Into<String>,
    ) -> Self {
        Self {
            event: event.into(),
            description: description.into(),
            created_by: created_by.into(),
            created_at: Utc::now(),
        }
    }
}

/// Resources resolved against the selected queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobResources {
    pub node_count: i64,
    pub processors_per_node: i64,
    /// GB per node; `None` when neither request nor queue bounds it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_per_node: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_run_time: Option<RunTime>,
}

/// Job record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub uuid: String,
    pub owner: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub internal_username: Option<String>,
    pub name: String,
    /// Software (app) identifier.
    pub software: String,
    pub system: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub queue: Option<String>,
    pub status: JobStatus,
    pub description: String,
    pub visible: bool,
    pub inputs: Map<String, Value>,
    pub parameters: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<JobResources>,
    pub notifications: Vec<Notification>,
    events: Vec<JobEvent>,
    pub created: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submit_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
}

impl Job {
    /// Create a visible PENDING job with a fresh UUID.
    pub fn new(
        owner: impl Into<String>,
        name: impl Into<String>,
        software: impl Into<String>,
        system: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            uuid: Uuid::new_v4().to_string(),
            owner: owner.into(),
            internal_username: None,
            name: name.into(),
            software: software.into(),
            system: system.into(),
            queue: None,
            status: JobStatus::Pending,
            description: JobStatus::Pending.description().to_string(),
            visible: true,
            inputs: Map::new(),
            parameters: Map::new(),
            resources: None,
            notifications: Vec::new(),
            events: Vec::new(),
            created: now,
            last_updated: now,
            submit_time: None,
            start_time: None,
            end_time: None,
        }
    }

    /// Audit log, oldest first.
    pub fn events(&self) -> &[JobEvent] {
        &self.events
    }

    pub fn last_event(&self) -> Option<&JobEvent> {
        self.events.last()
    }

    pub(crate) fn push_event(&mut self, event: JobEvent) {
        self.last_updated = event.created_at;
        self.events.push(event);
    }

    /// Active subscriptions owned by the job owner that fire for `event`.
    pub fn matching_notifications<'a>(&'a self, event: &'a str) -> impl Iterator<Item = &'a Notification> + 'a {
        self.notifications
            .iter()
            .filter(move |n| n.active && n.owner == self.owner && n.matches_event(event))
    }

    /// Serialize to JSON (pretty printed)
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
