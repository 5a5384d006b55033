//! Job submission assembly
//!
//! Turns a raw job request into a normalized [`Job`] record:
//! - Look up the software and check it runs on the target system
//! - Process inputs, parameters and notifications
//! - Resolve resources and pick a batch queue
//! - Compute the request key
//!
//! Nothing is persisted here; the caller hands the submission to its store.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::{info, warn};

use intake_fields::FieldError;
use intake_protocol::canonical_sha256;

use crate::collaborators::{PermissionChecker, SoftwareCatalog};
use crate::config::IntakeConfig;
use crate::error::JobProcessingError;
use crate::inputs::InputProcessor;
use crate::job::Job;
use crate::notifications::{NotificationError, NotificationProcessor};
use crate::parameters::ParameterProcessor;
use crate::selection::{ExecutionSystem, QueueProcessor};

/// Request keys naming the software, newest first.
const SOFTWARE_KEYS: &[&str] = &["appId", "softwareName"];

/// Request keys naming the job, newest first.
const NAME_KEYS: &[&str] = &["name", "jobName"];

/// Single-callback keys accepted when `notifications` is absent.
const CALLBACK_KEYS: &[&str] = &["callbackUrl", "callbackURL"];

/// A validated job ready to be stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSubmission {
    /// SHA-256 of the canonical JSON of the normalized request.
    pub request_key: String,
    pub job: Job,
}

/// Collaborators and settings shared by every submission.
pub struct SubmissionPipeline<'a> {
    config: &'a IntakeConfig,
    catalog: &'a dyn SoftwareCatalog,
    permissions: &'a dyn PermissionChecker,
}

impl<'a> SubmissionPipeline<'a> {
    pub fn new(
        config: &'a IntakeConfig,
        catalog: &'a dyn SoftwareCatalog,
        permissions: &'a dyn PermissionChecker,
    ) -> Self {
        Self {
            config,
            catalog,
            permissions,
        }
    }

    /// Validate `request` for `owner` and assemble the job record.
    pub fn submit(
        &self,
        system: &ExecutionSystem,
        owner: &str,
        internal_username: Option<&str>,
        request: &Map<String, Value>,
    ) -> Result<JobSubmission, JobProcessingError> {
        let result = self.assemble(system, owner, internal_username, request);
        match &result {
            Ok(submission) => info!(
                job = %submission.job.uuid,
                owner = %owner,
                software = %submission.job.software,
                queue = submission.job.queue.as_deref().unwrap_or(""),
                "job request accepted"
            ),
            Err(err) => warn!(owner = %owner, code = %err.code(), error = %err, "job request rejected"),
        }
        result
    }

    fn assemble(
        &self,
        system: &ExecutionSystem,
        owner: &str,
        internal_username: Option<&str>,
        request: &Map<String, Value>,
    ) -> Result<JobSubmission, JobProcessingError> {
        let software_id = required_text(request, SOFTWARE_KEYS)?;
        let name = required_text(request, NAME_KEYS)?;

        let software = self
            .catalog
            .software(&software_id)?
            .ok_or_else(|| JobProcessingError::UnknownSoftware(software_id.clone()))?;

        if software.execution_system != system.id {
            return Err(JobProcessingError::SystemMismatch {
                software: software.id.clone(),
                expected: software.execution_system.clone(),
                system: system.id.clone(),
            });
        }

        let mut job = Job::new(owner, name, software.id.clone(), system.id.clone());
        job.internal_username = internal_username.map(str::to_string);

        let inputs = InputProcessor::new(
            self.config,
            self.permissions,
            owner,
            job.internal_username.clone(),
        );
        job.inputs = inputs.process(&software.inputs, &section(request, "inputs")?)?;

        job.parameters =
            ParameterProcessor::new(self.config).process(&software.parameters, &section(request, "parameters")?)?;

        let notifications = NotificationProcessor::new(owner, job.uuid.clone());
        job.notifications = notifications.process(notification_value(request)?.as_ref())?;

        let selection = QueueProcessor::new(&software, system, self.config.ceiling()).process(request)?;
        job.queue = Some(selection.queue);
        job.resources = Some(selection.resources);

        let request_key = request_key(&job)?;
        Ok(JobSubmission { request_key, job })
    }
}

/// Stable digest of everything the request decided, excluding generated ids.
pub fn request_key(job: &Job) -> Result<String, JobProcessingError> {
    let subscriptions: Vec<Value> = job
        .notifications
        .iter()
        .map(|n| json!({ "event": n.event, "url": n.callback_url, "persistent": n.persistent }))
        .collect();

    let normalized = json!({
        "owner": job.owner,
        "name": job.name,
        "software": job.software,
        "system": job.system,
        "queue": job.queue,
        "resources": job.resources,
        "inputs": job.inputs,
        "parameters": job.parameters,
        "notifications": subscriptions,
    });
    Ok(canonical_sha256(&normalized)?)
}

fn required_text(request: &Map<String, Value>, keys: &[&str]) -> Result<String, JobProcessingError> {
    keys.iter()
        .filter_map(|key| request.get(*key).and_then(Value::as_str))
        .map(str::trim)
        .find(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or_else(|| {
            FieldError::MissingRequired {
                key: keys[0].to_string(),
            }
            .into()
        })
}

/// The `inputs` or `parameters` object of a request; absent means empty.
fn section(request: &Map<String, Value>, key: &str) -> Result<Map<String, Value>, JobProcessingError> {
    match request.get(key) {
        None | Some(Value::Null) => Ok(Map::new()),
        Some(Value::Object(map)) => Ok(map.clone()),
        Some(other) => Err(FieldError::UnsupportedValue {
            key: key.to_string(),
            value: other.to_string(),
        }
        .into()),
    }
}

/// Raw notification value, falling back to the legacy callback keys.
///
/// Strings that look like JSON are decoded first; a single object is treated
/// as a one-element array.
fn notification_value(request: &Map<String, Value>) -> Result<Option<Value>, NotificationError> {
    let raw = request
        .get("notifications")
        .filter(|v| !v.is_null())
        .or_else(|| CALLBACK_KEYS.iter().find_map(|key| request.get(*key)));

    let value = match raw {
        Some(Value::String(s)) if s.trim_start().starts_with(&['[', '{'][..]) => {
            serde_json::from_str::<Value>(s.trim()).map_err(|_| NotificationError::UnsupportedShape)?
        }
        Some(other) => other.clone(),
        None => return Ok(None),
    };

    if value.is_object() {
        return Ok(Some(Value::Array(vec![value])));
    }
    Ok(Some(value))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_notification_value_fallbacks() {
        let raw = notification_value(&request(json!({"callbackURL": "a@b.org"}))).unwrap();
        assert_eq!(raw, Some(json!("a@b.org")));

        let raw = notification_value(&request(json!({
            "notifications": "{\"url\": \"https://x.org\", \"event\": \"*\"}"
        })))
        .unwrap();
        assert_eq!(raw, Some(json!([{"url": "https://x.org", "event": "*"}])));

        assert_eq!(notification_value(&Map::new()).unwrap(), None);

        let err = notification_value(&request(json!({"notifications": "[not json"}))).unwrap_err();
        assert_eq!(err, NotificationError::UnsupportedShape);
    }

    #[test]
    fn test_required_text_uses_legacy_keys() {
        let req = request(json!({"softwareName": " wc-1.0 "}));
        assert_eq!(required_text(&req, SOFTWARE_KEYS).unwrap(), "wc-1.0");

        let err = required_text(&Map::new(), NAME_KEYS).unwrap_err();
        assert_eq!(err.to_string(), "No value specified for name");
    }

    #[test]
    fn test_section_shape() {
        assert!(section(&Map::new(), "inputs").unwrap().is_empty());
        assert!(section(&request(json!({"inputs": [1]})), "inputs").is_err());
    }

    #[test]
    fn test_request_key_ignores_ids() {
        let a = Job::new("alice", "run", "wc-1.0", "hpc");
        let b = Job::new("alice", "run", "wc-1.0", "hpc");
        assert_ne!(a.uuid, b.uuid);
        assert_eq!(request_key(&a).unwrap(), request_key(&b).unwrap());
        assert_eq!(request_key(&a).unwrap().len(), 64);
    }
}
