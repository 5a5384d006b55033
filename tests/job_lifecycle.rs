//! Job lifecycle through the status engine
//!
//! Status updates, hide and restore against the in-memory store, including
//! audit log contents and collaborator failures.

use job_intake::collaborators::JobStore;
use job_intake::engine::{EngineError, StatusUpdate, CANCELLED_BY_USER, HIDDEN_JOB_SUFFIX};
use job_intake::mock::{InMemoryJobStore, Operation, RecordingDispatcher};
use job_intake::notifications::Notification;
use job_intake::{Job, JobStatus, StatusEngine};

fn new_job(store: &InMemoryJobStore) -> Job {
    let mut job = Job::new("alice", "count", "wc-1.0", "hpc");
    let uuid = job.uuid.clone();
    job.notifications = vec![Notification::new(&uuid, "alice", "*", "alice@example.com", false)];
    store.save(&job).unwrap();
    job
}

fn event_names(job: &Job) -> Vec<&str> {
    job.events().iter().map(|e| e.event.as_str()).collect()
}

#[test]
fn test_full_lifecycle_records_every_step() {
    let store = InMemoryJobStore::default();
    let dispatcher = RecordingDispatcher::default();
    let engine = StatusEngine::new(&store, &dispatcher);
    let mut job = new_job(&store);

    for status in [
        JobStatus::ProcessingInputs,
        JobStatus::StagingInputs,
        JobStatus::Staged,
        JobStatus::Submitting,
        JobStatus::Queued,
        JobStatus::Running,
        JobStatus::CleaningUp,
        JobStatus::Finished,
    ] {
        assert_eq!(engine.update_status(&mut job, status, None).unwrap(), StatusUpdate::Applied);
    }

    assert_eq!(job.events().len(), 8);
    assert_eq!(job.last_event().unwrap().event, "FINISHED");
    assert_eq!(job.description, JobStatus::Finished.description());
    assert!(job.submit_time.unwrap() <= job.start_time.unwrap());
    assert!(job.start_time.unwrap() <= job.end_time.unwrap());
    assert_eq!(dispatcher.messages().len(), 8);

    let stored = store.get(&job.uuid).unwrap().unwrap();
    assert_eq!(stored, job);
}

#[test]
fn test_transitions_are_not_enforced() {
    let store = InMemoryJobStore::default();
    let dispatcher = RecordingDispatcher::default();
    let engine = StatusEngine::new(&store, &dispatcher);
    let mut job = new_job(&store);

    engine.update_status(&mut job, JobStatus::Finished, None).unwrap();
    engine.update_status(&mut job, JobStatus::Pending, None).unwrap();

    assert!(!JobStatus::Finished.can_transition_to(JobStatus::Pending));
    assert_eq!(job.status, JobStatus::Pending);
    assert_eq!(event_names(&job), vec!["FINISHED", "PENDING"]);
}

#[test]
fn test_custom_message_and_redundant_updates() {
    let store = InMemoryJobStore::default();
    let dispatcher = RecordingDispatcher::default();
    let engine = StatusEngine::new(&store, &dispatcher);
    let mut job = new_job(&store);

    engine.update_status(&mut job, JobStatus::Running, Some("50% complete")).unwrap();
    assert_eq!(job.description, "50% complete");

    let outcome = engine.update_status(&mut job, JobStatus::Running, Some("50% complete")).unwrap();
    assert_eq!(outcome, StatusUpdate::Unchanged);

    engine.update_status(&mut job, JobStatus::Running, Some("75% complete")).unwrap();
    assert_eq!(job.events().len(), 2);
    assert_eq!(dispatcher.messages().len(), 2);
}

#[test]
fn test_hide_running_job() {
    let store = InMemoryJobStore::default();
    let dispatcher = RecordingDispatcher::default();
    let engine = StatusEngine::new(&store, &dispatcher);
    let mut job = new_job(&store);
    engine.update_status(&mut job, JobStatus::Running, None).unwrap();

    let hidden = engine.hide(&job.uuid, "alice").unwrap();

    assert_eq!(event_names(&hidden), vec!["RUNNING", "STOPPED", "DELETED"]);
    assert_eq!(hidden.events()[1].description, CANCELLED_BY_USER);
    assert_eq!(hidden.events()[2].description, "Job was deleted by user alice.");
    assert_eq!(hidden.events()[2].created_by, "alice");
    assert!(!hidden.visible);
    assert!(!store.get(&job.uuid).unwrap().unwrap().visible);
}

#[test]
fn test_hide_finished_job_only_deletes() {
    let store = InMemoryJobStore::default();
    let dispatcher = RecordingDispatcher::default();
    let engine = StatusEngine::new(&store, &dispatcher);
    let mut job = new_job(&store);
    engine.update_status(&mut job, JobStatus::Failed, None).unwrap();

    let hidden = engine.hide(&job.uuid, "alice").unwrap();
    assert_eq!(event_names(&hidden), vec!["FAILED", "DELETED"]);
    assert_eq!(hidden.status, JobStatus::Failed);
}

#[test]
fn test_updates_to_hidden_job_are_logged_only() {
    let store = InMemoryJobStore::default();
    let dispatcher = RecordingDispatcher::default();
    let engine = StatusEngine::new(&store, &dispatcher);
    let mut job = new_job(&store);
    engine.update_status(&mut job, JobStatus::Finished, None).unwrap();
    let mut hidden = engine.hide(&job.uuid, "alice").unwrap();
    let sent_before = dispatcher.messages().len();

    let outcome = engine.update_status(&mut hidden, JobStatus::Archiving, None).unwrap();

    assert_eq!(outcome, StatusUpdate::Ignored);
    assert_eq!(hidden.status, JobStatus::Finished);
    let last = hidden.last_event().unwrap();
    assert_eq!(last.event, "ARCHIVING");
    assert!(last.description.ends_with(HIDDEN_JOB_SUFFIX));
    assert_eq!(dispatcher.messages().len(), sent_before);
}

#[test]
fn test_restore_always_records_event() {
    let store = InMemoryJobStore::default();
    let dispatcher = RecordingDispatcher::default();
    let engine = StatusEngine::new(&store, &dispatcher);
    let job = new_job(&store);

    engine.restore(&job.uuid, "alice").unwrap();
    let restored = engine.restore(&job.uuid, "alice").unwrap();

    assert_eq!(event_names(&restored), vec!["RESTORED", "RESTORED"]);
    assert!(restored.visible);
    let events: Vec<String> = dispatcher.messages().into_iter().map(|m| m.event).collect();
    assert_eq!(events, vec!["RESTORED", "RESTORED"]);
}

#[test]
fn test_store_failures_are_fatal() {
    let store = InMemoryJobStore::default();
    let dispatcher = RecordingDispatcher::default();
    let engine = StatusEngine::new(&store, &dispatcher);
    let mut job = new_job(&store);

    store.failures().inject_error(Operation::SaveJob, "disk full");
    assert!(matches!(
        engine.update_status(&mut job, JobStatus::Queued, None),
        Err(EngineError::Store(_))
    ));
    assert!(dispatcher.messages().is_empty());

    store.failures().clear();
    store.failures().inject_error(Operation::GetJob, "offline");
    assert!(matches!(engine.hide(&job.uuid, "alice"), Err(EngineError::Store(_))));
}

#[test]
fn test_unknown_job() {
    let store = InMemoryJobStore::default();
    let dispatcher = RecordingDispatcher::default();
    let engine = StatusEngine::new(&store, &dispatcher);

    let err = engine.hide("missing", "alice").unwrap_err();
    assert_eq!(err.to_string(), "No job found with id missing");
}
