//! Request and response bodies for the REST API

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::carbon_aware::{CarbonDataPoint, CarbonReading, DataSource};
use crate::insights::{self, Analysis};
use crate::jobs::{Job, JobStatus, ResourceUsage, Task};
use crate::recommendation::Recommendation;
use crate::service::ScheduleOutcome;
use crate::{Error, Result};

/// Body of `POST /schedule`
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TaskRequest {
    pub task_name: String,
    pub duration_hours: f64,
    pub resource_usage: String,
}

impl TaskRequest {
    pub fn into_task(self) -> Result<Task> {
        let usage = ResourceUsage::from_str(&self.resource_usage)?;
        Task::new(self.task_name, self.duration_hours, usage)
    }
}

/// Body of `PUT /jobs/{id}/status`
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StatusRequest {
    pub status: String,
}

impl StatusRequest {
    /// Only forward lifecycle states; cancelling goes through `DELETE /jobs/{id}`
    pub fn parse(&self) -> Result<JobStatus> {
        match JobStatus::from_str(&self.status)? {
            status @ (JobStatus::Running | JobStatus::Completed | JobStatus::Failed) => Ok(status),
            JobStatus::Cancelled => Err(Error::ValidationError(
                "use DELETE /jobs/{id} to cancel a job".to_string(),
            )),
            other => Err(Error::ValidationError(format!(
                "status must be running, completed or failed (got {})",
                other.as_str()
            ))),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CarbonDataResponse {
    pub carbon_intensity: f64,
    pub unit: String,
    pub location: String,
    pub timestamp: DateTime<Utc>,
    pub source: DataSource,
    pub forecast: Vec<CarbonDataPoint>,
}

impl From<CarbonReading> for CarbonDataResponse {
    fn from(reading: CarbonReading) -> Self {
        let source = reading.source();
        Self {
            carbon_intensity: reading.baseline.carbon_intensity,
            unit: reading.baseline.unit,
            location: reading.location,
            timestamp: reading.baseline.timestamp,
            source,
            forecast: reading.forecast,
        }
    }
}

/// Response of `POST /schedule`
#[derive(Debug, Serialize)]
pub struct ScheduleResponse {
    pub task: Task,
    pub carbon_data: CarbonDataResponse,
    pub recommendation: Recommendation,
    pub insights: String,
    pub analysis: Analysis,
    pub job: Job,
}

impl From<ScheduleOutcome> for ScheduleResponse {
    fn from(outcome: ScheduleOutcome) -> Self {
        let insights = insights::generate(&outcome.task, &outcome.reading, &outcome.recommendation);
        let analysis = Analysis::new(&outcome.reading, &outcome.recommendation);
        Self {
            task: outcome.task,
            carbon_data: outcome.reading.into(),
            recommendation: outcome.recommendation,
            insights,
            analysis,
            job: outcome.job,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ClearResponse {
    pub cleared: usize,
}

#[derive(Debug, Serialize)]
pub struct WelcomeResponse {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(error: &str, message: &str) -> Self {
        Self {
            error: error.to_string(),
            message: message.to_string(),
        }
    }
}
