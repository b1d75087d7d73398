use tokio::sync::{Mutex, MutexGuard};
use tracing::info;

use crate::job::{Job, JobId, JobSpec, ValidationError};
use crate::store::JobStore;

/// Error type for registry operations
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error(transparent)]
    Invalid(#[from] ValidationError),

    #[error("Job not found")]
    NotFound,
}

/// Serialized facade over the job store.
///
/// Both the HTTP layer and the scheduler loop go through this; the mutex
/// keeps all store mutation single-writer, so a scan never observes a
/// half-applied create or delete.
pub struct JobRegistry {
    store: Mutex<JobStore>,
}

impl Default for JobRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl JobRegistry {
    pub fn new() -> Self {
        Self {
            store: Mutex::new(JobStore::new()),
        }
    }

    /// Validate a job specification and store it.
    ///
    /// On validation failure nothing is mutated and no id is consumed.
    pub async fn create(&self, spec: &JobSpec) -> Result<Job, RegistryError> {
        let schedule = spec.validate()?;
        let job = self.store.lock().await.insert(schedule);
        info!(job_id = %job.id, "Job registered");
        Ok(job)
    }

    /// All current jobs in insertion order
    pub async fn list(&self) -> Vec<Job> {
        self.store.lock().await.jobs().to_vec()
    }

    /// Remove a job, returning the removed record.
    ///
    /// An execution already dispatched for this job is unaffected; the job
    /// simply stops matching on future ticks.
    pub async fn delete(&self, id: JobId) -> Result<Job, RegistryError> {
        let removed = self
            .store
            .lock()
            .await
            .remove(id)
            .ok_or(RegistryError::NotFound)?;
        info!(job_id = %id, "Job deleted");
        Ok(removed)
    }

    /// Lock the underlying store for a matcher pass
    pub(crate) async fn lock(&self) -> MutexGuard<'_, JobStore> {
        self.store.lock().await
    }
}
