//! Input processing: URI syntax, scheme support and read permission

mod fixtures;

use fixtures::{request, wc_software};
use intake_fields::FieldError;
use job_intake::collaborators::{PermissionChecker, PermissionError, PrefixPermissions};
use job_intake::inputs::InputProcessor;
use job_intake::{IntakeConfig, JobProcessingError};
use serde_json::{json, Map, Value};
use std::cell::RefCell;

/// Records every URI it is asked about and allows all of them.
#[derive(Default)]
struct AuditingPermissions {
    asked: RefCell<Vec<String>>,
}

impl PermissionChecker for AuditingPermissions {
    fn can_read(&self, _: &str, _: Option<&str>, uri: &str) -> Result<bool, PermissionError> {
        self.asked.borrow_mut().push(uri.to_string());
        Ok(true)
    }
}

fn alice_permissions() -> PrefixPermissions {
    PrefixPermissions::new(["agave://storage/alice/", "https://data.example.com/"])
}

fn process(
    permissions: &dyn PermissionChecker,
    value: Value,
) -> Result<Map<String, Value>, JobProcessingError> {
    let config = IntakeConfig::default();
    let software = wc_software();
    InputProcessor::new(&config, permissions, "alice", None).process(&software.inputs, &request(value))
}

#[test]
fn test_accepts_readable_inputs_and_injects_hidden_default() {
    let out = process(
        &alice_permissions(),
        json!({"query": ["agave://storage/alice/a.txt", "https://data.example.com/b.txt"]}),
    )
    .unwrap();

    assert_eq!(
        out["query"],
        json!(["agave://storage/alice/a.txt", "https://data.example.com/b.txt"])
    );
    assert_eq!(out["reference"], json!("agave://storage/shared/reference.txt"));
    assert!(!out.contains_key("config"));
}

#[test]
fn test_hidden_default_is_not_permission_checked() {
    let permissions = AuditingPermissions::default();
    process(&permissions, json!({"query": "inputs/a.txt"})).unwrap();

    assert_eq!(*permissions.asked.borrow(), vec!["inputs/a.txt".to_string()]);
}

#[test]
fn test_missing_required_input() {
    let err = process(&alice_permissions(), json!({"query": " ; "})).unwrap_err();
    assert!(matches!(
        err,
        JobProcessingError::Field(FieldError::MissingRequired { ref key }) if key == "query"
    ));
    assert_eq!(err.to_string(), "No value specified for query");
}

#[test]
fn test_denied_input_is_forbidden() {
    let err = process(&alice_permissions(), json!({"query": "agave://storage/bob/secret.txt"})).unwrap_err();

    assert_eq!(err.http_status(), 403);
    assert_eq!(
        err.to_string(),
        "You do not have permission to access this the input file or directory at agave://storage/bob/secret.txt"
    );
}

#[test]
fn test_unsupported_scheme_is_bad_request() {
    let err = process(&AuditingPermissions::default(), json!({"query": "file:///etc/passwd"})).unwrap_err();

    assert_eq!(err.http_status(), 400);
    assert!(err.to_string().contains("file scheme are not currently supported"));
}

#[test]
fn test_configured_schemes() {
    let config = IntakeConfig::build(None, Some(json!({"inputs": {"supported_schemes": ["agave"]}}))).unwrap();
    let software = wc_software();
    let permissions = AuditingPermissions::default();
    let processor = InputProcessor::new(&config, &permissions, "alice", None);

    let err = processor
        .process(&software.inputs, &request(json!({"query": "https://data.example.com/a"})))
        .unwrap_err();
    assert!(matches!(err, JobProcessingError::InvalidInput { .. }));

    processor
        .process(&software.inputs, &request(json!({"query": "AGAVE://storage/alice/a"})))
        .unwrap();
}

#[test]
fn test_malformed_uri() {
    let err = process(&AuditingPermissions::default(), json!({"query": "agave://storage/alice/a b.txt"})).unwrap_err();
    assert!(matches!(err, JobProcessingError::InvalidInput { .. }));
}

#[test]
fn test_validator_applies_to_inputs() {
    let err = process(
        &AuditingPermissions::default(),
        json!({"query": "inputs/a.txt", "config": "inputs/settings.json"}),
    )
    .unwrap_err();
    assert!(matches!(err, JobProcessingError::Field(FieldError::ValidatorMismatch { .. })));

    let out = process(
        &AuditingPermissions::default(),
        json!({"query": "inputs/a.txt", "config": "inputs/settings.yml"}),
    )
    .unwrap();
    assert_eq!(out["config"], json!("inputs/settings.yml"));
}

#[test]
fn test_relative_paths_can_be_denied() {
    let strict = alice_permissions().deny_relative(true);
    let err = process(&strict, json!({"query": "inputs/a.txt"})).unwrap_err();
    assert_eq!(err.http_status(), 403);
}
