//! End-to-end job request processing for `wc-1.0` on `hpc`

mod fixtures;

use fixtures::{hpc_system, load_request, request, wc_software};
use job_intake::collaborators::PrefixPermissions;
use job_intake::mock::{Operation, StaticCatalog};
use job_intake::{
    ErrorCode, ExecutionSystem, IntakeConfig, JobProcessingError, JobStatus, SubmissionPipeline,
};
use serde_json::json;

fn alice_permissions() -> PrefixPermissions {
    PrefixPermissions::new(["agave://storage/alice/", "agave://storage/shared/"])
}

#[test]
fn test_basic_request_is_normalized() {
    let config = IntakeConfig::default();
    let catalog = StaticCatalog::new([wc_software()]);
    let permissions = alice_permissions();
    let pipeline = SubmissionPipeline::new(&config, &catalog, &permissions);

    let submission = pipeline
        .submit(&hpc_system(), "alice", None, &load_request("wc_basic.json"))
        .unwrap();
    let job = &submission.job;

    assert_eq!(job.owner, "alice");
    assert_eq!(job.name, "count words");
    assert_eq!(job.software, "wc-1.0");
    assert_eq!(job.system, "hpc");
    assert_eq!(job.status, JobStatus::Pending);
    assert!(job.visible);
    assert_eq!(job.queue.as_deref(), Some("normal"));

    assert_eq!(
        job.inputs["query"],
        json!(["agave://storage/alice/a.txt", "agave://storage/alice/b.txt"])
    );
    assert_eq!(job.inputs["reference"], json!("agave://storage/shared/reference.txt"));
    assert!(!job.inputs.contains_key("config"));

    assert_eq!(job.parameters["lines"], json!(true));
    assert_eq!(job.parameters["threads"], json!("4"));
    assert_eq!(job.parameters["mode"], json!("fast"));
    assert_eq!(job.parameters["labels"], json!(["x", "y"]));
    assert_eq!(job.parameters["engine"], json!("gnu"));

    assert_eq!(job.notifications.len(), 2);
    assert!(job.notifications.iter().all(|n| n.subject_uuid == job.uuid));
    assert!(job.notifications.iter().all(|n| n.owner == "alice"));
    assert_eq!(job.notifications[1].event, "FINISHED");
    assert!(job.notifications[1].persistent);

    let resources = job.resources.as_ref().unwrap();
    assert_eq!(resources.node_count, 1);
    assert_eq!(resources.processors_per_node, 1);
    assert_eq!(resources.max_run_time.unwrap().to_string(), "01:00:00");

    assert_eq!(submission.request_key.len(), 64);
}

#[test]
fn test_request_key_is_stable() {
    let config = IntakeConfig::default();
    let catalog = StaticCatalog::new([wc_software()]);
    let permissions = alice_permissions();
    let pipeline = SubmissionPipeline::new(&config, &catalog, &permissions);
    let system = hpc_system();
    let req = load_request("wc_basic.json");

    let first = pipeline.submit(&system, "alice", None, &req).unwrap();
    let second = pipeline.submit(&system, "alice", None, &req).unwrap();

    assert_ne!(first.job.uuid, second.job.uuid);
    assert_eq!(first.request_key, second.request_key);

    let mut changed = req.clone();
    changed.insert("name".to_string(), json!("count more words"));
    let third = pipeline.submit(&system, "alice", None, &changed).unwrap();
    assert_ne!(first.request_key, third.request_key);
}

#[test]
fn test_legacy_keys() {
    let config = IntakeConfig::default();
    let catalog = StaticCatalog::new([wc_software()]);
    let permissions = alice_permissions();
    let pipeline = SubmissionPipeline::new(&config, &catalog, &permissions);

    let submission = pipeline
        .submit(
            &hpc_system(),
            "alice",
            None,
            &request(json!({
                "jobName": "legacy",
                "softwareName": "wc-1.0",
                "inputs": {"query": "agave://storage/alice/a.txt"},
                "callbackUrl": "alice@example.com",
                "queue": "debug",
                "requestedTime": "00:10:00"
            })),
        )
        .unwrap();

    let events: Vec<&str> = submission
        .job
        .notifications
        .iter()
        .map(|n| n.event.as_str())
        .collect();
    assert_eq!(events, vec!["FINISHED", "FAILED", "STOPPED"]);
    assert_eq!(submission.job.queue.as_deref(), Some("debug"));
    assert_eq!(submission.job.name, "legacy");
}

#[test]
fn test_unknown_software() {
    let config = IntakeConfig::default();
    let catalog = StaticCatalog::new([wc_software()]);
    let permissions = alice_permissions();
    let pipeline = SubmissionPipeline::new(&config, &catalog, &permissions);

    let err = pipeline
        .submit(
            &hpc_system(),
            "alice",
            None,
            &request(json!({"name": "x", "appId": "grep-2.0"})),
        )
        .unwrap_err();

    assert!(matches!(err, JobProcessingError::UnknownSoftware(_)));
    assert_eq!(err.http_status(), 400);
}

#[test]
fn test_system_mismatch() {
    let config = IntakeConfig::default();
    let catalog = StaticCatalog::new([wc_software()]);
    let permissions = alice_permissions();
    let pipeline = SubmissionPipeline::new(&config, &catalog, &permissions);
    let other = ExecutionSystem::from_toml_str(
        r#"
id = "cloud"

[[queues]]
name = "default"
system_default = true
"#,
    )
    .unwrap();

    let err = pipeline
        .submit(&other, "alice", None, &load_request("wc_basic.json"))
        .unwrap_err();
    assert!(matches!(err, JobProcessingError::SystemMismatch { .. }));
    assert_eq!(err.code(), ErrorCode::InvalidRequest);
}

#[test]
fn test_catalog_failure_is_server_error() {
    let config = IntakeConfig::default();
    let catalog = StaticCatalog::new([wc_software()]);
    catalog
        .failures()
        .inject_error(Operation::LookupSoftware, "catalog offline");
    let permissions = alice_permissions();
    let pipeline = SubmissionPipeline::new(&config, &catalog, &permissions);

    let err = pipeline
        .submit(&hpc_system(), "alice", None, &load_request("wc_basic.json"))
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::ProcessingFailed);
    assert_eq!(err.http_status(), 500);
}

#[test]
fn test_unreadable_input_is_forbidden() {
    let config = IntakeConfig::default();
    let catalog = StaticCatalog::new([wc_software()]);
    let permissions = alice_permissions();
    let pipeline = SubmissionPipeline::new(&config, &catalog, &permissions);

    let mut req = load_request("wc_basic.json");
    req.insert("inputs".to_string(), json!({"query": "agave://storage/bob/secret.txt"}));

    let err = pipeline.submit(&hpc_system(), "alice", None, &req).unwrap_err();
    let payload = err.to_payload();
    assert_eq!(payload.code, ErrorCode::PermissionDenied);
    assert_eq!(payload.data, Some(json!({"field": "query"})));
}

#[test]
fn test_oversized_request_has_no_queue() {
    let config = IntakeConfig::default();
    let catalog = StaticCatalog::new([wc_software()]);
    let permissions = alice_permissions();
    let pipeline = SubmissionPipeline::new(&config, &catalog, &permissions);

    let mut req = load_request("wc_basic.json");
    req.insert("nodeCount".to_string(), json!(1000));

    let err = pipeline.submit(&hpc_system(), "alice", None, &req).unwrap_err();
    assert_eq!(err.code(), ErrorCode::NoMatchingQueue);
}

#[test]
fn test_missing_name() {
    let config = IntakeConfig::default();
    let catalog = StaticCatalog::new([wc_software()]);
    let permissions = alice_permissions();
    let pipeline = SubmissionPipeline::new(&config, &catalog, &permissions);

    let mut req = load_request("wc_basic.json");
    req.remove("name");

    let err = pipeline.submit(&hpc_system(), "alice", None, &req).unwrap_err();
    assert_eq!(err.key(), Some("name"));
    assert_eq!(err.code(), ErrorCode::InvalidRequest);
}
