use std::sync::Arc;

use async_trait::async_trait;
use chrono::Local;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::job::JobId;

/// The work a dispatched job performs. Receives only the job id, never a
/// reference into the store.
#[async_trait]
pub trait JobRunner: Send + Sync + 'static {
    async fn run(&self, id: JobId) -> Result<(), String>;
}

/// Stub runner that logs a greeting for the job, standing in for real work
pub struct HelloRunner;

#[async_trait]
impl JobRunner for HelloRunner {
    async fn run(&self, id: JobId) -> Result<(), String> {
        info!(job_id = %id, "[{}] Hello World (job #{})", Local::now().format("%Y-%m-%d %H:%M:%S"), id);
        Ok(())
    }
}

/// Hands due jobs to isolated execution tasks and observes their outcomes.
///
/// Dispatch is fire-and-forget: the scheduler loop never waits on a running
/// job. Each dispatch spawns an inner task for the runner (which confines
/// panics) and an observer that logs exactly one terminal outcome. Failures
/// of any form are logged and otherwise ignored; the job stays eligible for
/// its next natural due minute.
pub struct Dispatcher {
    runner: Arc<dyn JobRunner>,
}

impl Dispatcher {
    pub fn new(runner: Arc<dyn JobRunner>) -> Self {
        Self { runner }
    }

    /// Spawn an execution task for the job and return immediately.
    ///
    /// The returned handle belongs to the outcome observer, not the job
    /// itself; callers are free to drop it.
    pub fn dispatch(&self, id: JobId) -> JoinHandle<()> {
        let runner = Arc::clone(&self.runner);
        tokio::spawn(async move {
            debug!(job_id = %id, "Dispatching job");

            let execution = tokio::spawn(async move { runner.run(id).await });

            match execution.await {
                Ok(Ok(())) => {
                    debug!(job_id = %id, "Job succeeded");
                }
                Ok(Err(e)) => {
                    error!(job_id = %id, error = %e, "Job #{} failed", id);
                }
                Err(join_err) if join_err.is_panic() => {
                    error!(job_id = %id, "Job #{} failed: execution panicked", id);
                }
                Err(_) => {
                    error!(job_id = %id, "Job #{} failed: execution cancelled", id);
                }
            }
        })
    }
}
