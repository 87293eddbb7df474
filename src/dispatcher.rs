//! Automatic job advance
//!
//! Moves `pending` jobs to `running` once their scheduled start has passed,
//! and `running` jobs to `completed` once their expected duration has elapsed.
//! Every step goes through [`JobStore::advance`], so a job cancelled between
//! the scan and the advance is simply skipped.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::jobs::{Job, JobStatus, JobStore};
use crate::Error;

pub struct JobDispatcher {
    store: Arc<JobStore>,
    interval: std::time::Duration,
}

impl JobDispatcher {
    pub fn new(store: Arc<JobStore>, tick_secs: u64) -> Self {
        Self {
            store,
            interval: std::time::Duration::from_secs(tick_secs.max(1)),
        }
    }

    /// Advance every due job once; returns the number of transitions applied
    pub async fn tick(&self, now: DateTime<Utc>) -> usize {
        let mut applied = 0;
        for job in self.store.list().await {
            let mut current = job;
            if current.status == JobStatus::Pending && now >= current.scheduled_time {
                match self.step(&current, JobStatus::Running).await {
                    Some(next) => {
                        applied += 1;
                        current = next;
                    }
                    None => continue,
                }
            }
            if current.status == JobStatus::Running
                && now >= current.scheduled_end()
                && self.step(&current, JobStatus::Completed).await.is_some()
            {
                applied += 1;
            }
        }
        applied
    }

    async fn step(&self, job: &Job, next: JobStatus) -> Option<Job> {
        match self.store.advance(job.id, next).await {
            Ok(updated) => {
                info!("Job {} ({}) is now {}", job.id, job.task.task_name, next);
                Some(updated)
            }
            Err(Error::Conflict(reason)) | Err(Error::NotFound(reason)) => {
                debug!("Skipped advancing job {}: {}", job.id, reason);
                None
            }
            Err(e) => {
                warn!("Failed to advance job {}: {}", job.id, e);
                None
            }
        }
    }

    /// Start the background tick loop
    pub fn start(self: Arc<Self>) -> JoinHandle<()> {
        info!("Started job dispatcher (tick every {:?})", self.interval);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            loop {
                ticker.tick().await;
                let applied = self.tick(Utc::now()).await;
                if applied > 0 {
                    debug!("Dispatcher applied {} transition(s)", applied);
                }
            }
        })
    }
}
