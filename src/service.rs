//! Scheduling orchestration
//!
//! Ties the carbon provider, the recommendation engine and the job store
//! together. A job is only persisted once every field has been computed, so a
//! failed request leaves the store untouched.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{error, info, instrument, warn};

use crate::carbon_aware::{CarbonIntensityProvider, CarbonReading, Horizon};
use crate::config::ProviderConfig;
use crate::jobs::{Job, JobDraft, JobId, JobStatus, JobStore, Task};
use crate::recommendation::{Recommendation, RecommendationEngine};
use crate::{Error, Result};

/// Everything produced by one scheduling request
#[derive(Clone, Debug)]
pub struct ScheduleOutcome {
    pub task: Task,
    pub reading: CarbonReading,
    pub recommendation: Recommendation,
    pub job: Job,
}

pub struct SchedulingService {
    provider: Arc<dyn CarbonIntensityProvider>,
    engine: RecommendationEngine,
    store: Arc<JobStore>,
    region: String,
    horizon_hours: u32,
    resolution_minutes: u32,
}

impl SchedulingService {
    pub fn new(
        provider: Arc<dyn CarbonIntensityProvider>,
        engine: RecommendationEngine,
        store: Arc<JobStore>,
        provider_config: &ProviderConfig,
    ) -> Self {
        Self {
            provider,
            engine,
            store,
            region: provider_config.region.clone(),
            horizon_hours: provider_config.horizon_hours,
            resolution_minutes: provider_config.resolution_minutes,
        }
    }

    pub fn store(&self) -> &Arc<JobStore> {
        &self.store
    }

    /// Compute a recommendation for `task` without persisting anything
    pub async fn recommend_at(
        &self,
        task: &Task,
        now: DateTime<Utc>,
    ) -> Result<(CarbonReading, Recommendation)> {
        let horizon = Horizon::new(now, self.horizon_hours, self.resolution_minutes);
        let reading = self
            .provider
            .fetch(&self.region, horizon)
            .await
            .map_err(|e| {
                error!("No carbon data for {}: {}", self.region, e);
                Error::Internal(format!("no carbon data for {}: {}", self.region, e))
            })?;

        let recommendation =
            match self
                .engine
                .recommend(task, &reading.baseline, &reading.forecast)
            {
                Ok(recommendation) => recommendation,
                Err(Error::DataUnavailable(reason)) => {
                    warn!(
                        "No usable forecast for {} ({}); scheduling '{}' now",
                        self.region, reason, task.task_name
                    );
                    self.engine.run_now(task, &reading.baseline)
                }
                Err(e) => return Err(e),
            };

        #[cfg(feature = "metrics")]
        crate::metrics::observe_confidence(recommendation.confidence_score);

        Ok((reading, recommendation))
    }

    /// Recommend and persist a job for `task`
    pub async fn schedule(&self, task: Task) -> Result<ScheduleOutcome> {
        self.schedule_at(task, Utc::now()).await
    }

    #[instrument(skip(self, task), fields(task = %task.task_name))]
    pub async fn schedule_at(&self, task: Task, now: DateTime<Utc>) -> Result<ScheduleOutcome> {
        let (reading, recommendation) = match self.recommend_at(&task, now).await {
            Ok(result) => result,
            Err(e) => {
                #[cfg(feature = "metrics")]
                crate::metrics::record_schedule("failed");
                return Err(e);
            }
        };

        let draft = JobDraft {
            task: task.clone(),
            created_at: now,
            carbon_intensity: reading.baseline.carbon_intensity,
            scheduled_time: recommendation.recommended_start_time,
            expected_intensity: recommendation.expected_intensity,
            carbon_saved: recommendation.carbon_savings_estimate,
            confidence_score: recommendation.confidence_score,
            reasoning: recommendation.reasoning.clone(),
            alternative_windows: recommendation.alternative_windows.clone(),
        };
        let job = self.store.create(draft).await;

        info!(
            "Scheduled job {} for {} ({:.1} -> {:.1} {}, {:.3} kg CO2 saved, source {:?})",
            job.id,
            job.scheduled_time.to_rfc3339(),
            job.carbon_intensity,
            job.expected_intensity,
            reading.baseline.unit,
            job.carbon_saved,
            reading.source()
        );
        #[cfg(feature = "metrics")]
        crate::metrics::record_schedule(if recommendation.low_confidence {
            "low_confidence"
        } else {
            "scheduled"
        });

        Ok(ScheduleOutcome {
            task,
            reading,
            recommendation,
            job,
        })
    }

    pub async fn list_jobs(&self) -> Vec<Job> {
        self.store.list().await
    }

    pub async fn cancel_job(&self, id: JobId) -> Result<Job> {
        self.store.cancel(id).await
    }

    pub async fn advance_job(&self, id: JobId, next: JobStatus) -> Result<Job> {
        self.store.advance(id, next).await
    }

    pub async fn clear_jobs(&self) -> usize {
        self.store.clear().await
    }
}
