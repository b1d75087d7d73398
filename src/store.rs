use crate::job::{Job, JobId, Schedule};

/// In-memory collection of job records.
///
/// Owns identity assignment and all mutation. Ids are assigned from a
/// monotonically increasing counter and never reused, so a deleted job's id
/// stays dead even if the job is recreated with the same schedule.
pub struct JobStore {
    jobs: Vec<Job>,
    next_id: u64,
}

impl Default for JobStore {
    fn default() -> Self {
        Self::new()
    }
}

impl JobStore {
    pub fn new() -> Self {
        Self {
            jobs: Vec::new(),
            next_id: 1,
        }
    }

    /// Store a new job with the next id, returning a copy of the record
    pub fn insert(&mut self, schedule: Schedule) -> Job {
        let job = Job::new(JobId(self.next_id), schedule);
        self.next_id += 1;
        self.jobs.push(job.clone());
        job
    }

    /// Remove a job by id, returning the removed record if it existed
    pub fn remove(&mut self, id: JobId) -> Option<Job> {
        let idx = self.jobs.iter().position(|j| j.id == id)?;
        Some(self.jobs.remove(idx))
    }

    /// All jobs in insertion order
    pub fn jobs(&self) -> &[Job] {
        &self.jobs
    }

    /// Mutable view for the matcher's scan pass; `last_run` is only ever
    /// written through this, behind the registry's lock.
    pub(crate) fn jobs_mut(&mut self) -> &mut [Job] {
        &mut self.jobs
    }

    pub(crate) fn len(&self) -> usize {
        self.jobs.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}
