//! In-memory job store and software catalog

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use super::failure::{FailureInjector, Operation};
use crate::catalog::Software;
use crate::collaborators::{CollaboratorError, JobStore, SoftwareCatalog};
use crate::job::Job;

#[derive(Debug, Default)]
pub struct InMemoryJobStore {
    jobs: Mutex<HashMap<String, Job>>,
    failures: FailureInjector,
}

impl InMemoryJobStore {
    pub fn failures(&self) -> &FailureInjector {
        &self.failures
    }

    pub fn len(&self) -> usize {
        self.jobs.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned() -> CollaboratorError {
    CollaboratorError::new("job store", "lock poisoned")
}

impl JobStore for InMemoryJobStore {
    fn get(&self, uuid: &str) -> Result<Option<Job>, CollaboratorError> {
        self.failures.check(Operation::GetJob)?;
        let jobs = self.jobs.lock().map_err(|_| poisoned())?;
        Ok(jobs.get(uuid).cloned())
    }

    fn save(&self, job: &Job) -> Result<(), CollaboratorError> {
        self.failures.check(Operation::SaveJob)?;
        let mut jobs = self.jobs.lock().map_err(|_| poisoned())?;
        jobs.insert(job.uuid.clone(), job.clone());
        Ok(())
    }
}

/// Catalog over a fixed set of definitions.
#[derive(Debug, Default)]
pub struct StaticCatalog {
    software: HashMap<String, Software>,
    failures: FailureInjector,
}

impl StaticCatalog {
    pub fn new(software: impl IntoIterator<Item = Software>) -> Self {
        Self {
            software: software.into_iter().map(|s| (s.id.clone(), s)).collect(),
            failures: FailureInjector::default(),
        }
    }

    pub fn failures(&self) -> &FailureInjector {
        &self.failures
    }
}

impl SoftwareCatalog for StaticCatalog {
    fn software(&self, id: &str) -> Result<Option<Software>, CollaboratorError> {
        self.failures.check(Operation::LookupSoftware)?;
        Ok(self.software.get(id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_roundtrip_and_failure() {
        let store = InMemoryJobStore::default();
        let job = Job::new("alice", "run", "wc-1.0", "hpc");
        store.save(&job).unwrap();
        assert_eq!(store.get(&job.uuid).unwrap(), Some(job.clone()));
        assert!(store.get("missing").unwrap().is_none());

        store.failures().inject_error(Operation::GetJob, "offline");
        assert!(store.get(&job.uuid).is_err());
    }

    #[test]
    fn test_static_catalog() {
        let catalog = StaticCatalog::new([Software::new("wc-1.0", "hpc")]);
        assert!(catalog.software("wc-1.0").unwrap().is_some());
        assert!(catalog.software("grep-2.0").unwrap().is_none());
    }
}
