//! In-memory job store
//!
//! All jobs live behind a single `RwLock`. Every mutation takes the write
//! lock, so a status change reads the current status and writes the new one
//! as one step: concurrent `cancel` and `advance` calls on the same job are
//! serialized and the loser sees the winner's status, which fails the edge
//! check with `Conflict`. `clear` holds the same exclusive lock, so a
//! concurrent `list` observes either every job or none.

use std::collections::BTreeMap;

use chrono::Utc;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::jobs::{Job, JobDraft, JobId, JobStatus};
use crate::{Error, Result};

#[derive(Default)]
struct StoreInner {
    next_id: u64,
    /// Ids are allocated monotonically, so key order is creation order
    jobs: BTreeMap<JobId, Job>,
}

#[derive(Default)]
pub struct JobStore {
    inner: RwLock<StoreInner>,
}

impl JobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Persist a fully computed job in `pending`
    pub async fn create(&self, draft: JobDraft) -> Job {
        let mut inner = self.inner.write().await;
        inner.next_id += 1;
        let id = JobId(inner.next_id);
        let job = Job::from_draft(id, draft);
        inner.jobs.insert(id, job.clone());
        info!(
            "Created job {} ({}) scheduled for {}",
            id,
            job.task.task_name,
            job.scheduled_time.to_rfc3339()
        );
        job
    }

    /// All jobs in creation order
    pub async fn list(&self) -> Vec<Job> {
        self.inner.read().await.jobs.values().cloned().collect()
    }

    pub async fn get(&self, id: JobId) -> Result<Job> {
        self.inner
            .read()
            .await
            .jobs
            .get(&id)
            .cloned()
            .ok_or_else(|| not_found(id))
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.jobs.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Cancel a job; only `pending` jobs can be cancelled
    pub async fn cancel(&self, id: JobId) -> Result<Job> {
        self.transition(id, JobStatus::Cancelled).await
    }

    /// Administrative or automatic transition along the allowed edge list
    pub async fn advance(&self, id: JobId, next: JobStatus) -> Result<Job> {
        self.transition(id, next).await
    }

    /// Remove every job, returning how many were removed
    pub async fn clear(&self) -> usize {
        let mut inner = self.inner.write().await;
        let removed = inner.jobs.len();
        inner.jobs.clear();
        if removed > 0 {
            info!("Cleared {} job(s)", removed);
        }
        removed
    }

    async fn transition(&self, id: JobId, next: JobStatus) -> Result<Job> {
        let mut inner = self.inner.write().await;
        let job = inner.jobs.get_mut(&id).ok_or_else(|| not_found(id))?;

        let from = job.status;
        job.status = from
            .transition(next)
            .map_err(|_| Error::Conflict(format!("job {} is {}, cannot move to {}", id, from, next)))?;
        job.updated_at = Utc::now();

        debug!("Job {} transitioned {} -> {}", id, from, next);
        #[cfg(feature = "metrics")]
        crate::metrics::record_transition(from, next);

        Ok(job.clone())
    }
}

fn not_found(id: JobId) -> Error {
    Error::NotFound(format!("job {} does not exist", id))
}
