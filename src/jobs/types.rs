//! Task and job records

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::jobs::JobStatus;
use crate::recommendation::RecommendationWindow;
use crate::{Error, Result};

/// Resource tier of a task, a proxy for its power draw
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResourceUsage {
    Low,
    Medium,
    High,
    VeryHigh,
}

impl ResourceUsage {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceUsage::Low => "low",
            ResourceUsage::Medium => "medium",
            ResourceUsage::High => "high",
            ResourceUsage::VeryHigh => "very-high",
        }
    }
}

impl fmt::Display for ResourceUsage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceUsage {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(ResourceUsage::Low),
            "medium" => Ok(ResourceUsage::Medium),
            "high" => Ok(ResourceUsage::High),
            "very-high" | "very_high" => Ok(ResourceUsage::VeryHigh),
            other => Err(Error::ValidationError(format!(
                "unknown resource_usage '{}' (expected low, medium, high or very-high)",
                other
            ))),
        }
    }
}

/// Shortest accepted task, one minute
pub const MIN_DURATION_HOURS: f64 = 1.0 / 60.0;

/// Longest accepted task, one leap year
pub const MAX_DURATION_HOURS: f64 = 24.0 * 366.0;

/// A validated task submission
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Task {
    pub task_name: String,
    pub duration_hours: f64,
    pub resource_usage: ResourceUsage,
}

impl Task {
    /// Build a task, rejecting empty names and non-positive durations
    pub fn new(
        task_name: impl Into<String>,
        duration_hours: f64,
        resource_usage: ResourceUsage,
    ) -> Result<Self> {
        let task_name = task_name.into();
        if task_name.trim().is_empty() {
            return Err(Error::ValidationError(
                "task_name must not be empty".to_string(),
            ));
        }
        if !duration_hours.is_finite() || duration_hours <= 0.0 {
            return Err(Error::ValidationError(format!(
                "duration_hours must be greater than 0 (got {})",
                duration_hours
            )));
        }
        if !(MIN_DURATION_HOURS..=MAX_DURATION_HOURS).contains(&duration_hours) {
            return Err(Error::ValidationError(format!(
                "duration_hours must be between one minute and {} hours (got {})",
                MAX_DURATION_HOURS, duration_hours
            )));
        }
        Ok(Self {
            task_name,
            duration_hours,
            resource_usage,
        })
    }

    /// Run time as a chrono duration, saturating for out-of-range values
    pub fn duration(&self) -> Duration {
        let millis = (self.duration_hours * 3_600_000.0).round() as i64;
        Duration::try_milliseconds(millis).unwrap_or(Duration::MAX)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
#[serde(transparent)]
pub struct JobId(pub u64);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Everything computed for a job before it is persisted
#[derive(Clone, Debug)]
pub struct JobDraft {
    pub task: Task,
    pub created_at: DateTime<Utc>,
    /// Baseline intensity at submission time
    pub carbon_intensity: f64,
    pub scheduled_time: DateTime<Utc>,
    pub expected_intensity: f64,
    pub carbon_saved: f64,
    pub confidence_score: f64,
    pub reasoning: String,
    pub alternative_windows: Vec<RecommendationWindow>,
}

/// A persisted job
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Job {
    pub id: JobId,
    #[serde(flatten)]
    pub task: Task,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub carbon_intensity: f64,
    pub scheduled_time: DateTime<Utc>,
    pub expected_intensity: f64,
    pub carbon_saved: f64,
    pub confidence_score: f64,
    pub reasoning: String,
    pub alternative_windows: Vec<RecommendationWindow>,
}

impl Job {
    pub(crate) fn from_draft(id: JobId, draft: JobDraft) -> Self {
        Self {
            id,
            task: draft.task,
            status: JobStatus::Pending,
            created_at: draft.created_at,
            updated_at: draft.created_at,
            carbon_intensity: draft.carbon_intensity,
            scheduled_time: draft.scheduled_time,
            expected_intensity: draft.expected_intensity,
            carbon_saved: draft.carbon_saved,
            confidence_score: draft.confidence_score,
            reasoning: draft.reasoning,
            alternative_windows: draft.alternative_windows,
        }
    }

    /// When the job is expected to finish if started on schedule
    pub fn scheduled_end(&self) -> DateTime<Utc> {
        self.scheduled_time
            .checked_add_signed(self.task.duration())
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_validation() {
        assert!(Task::new("Train model", 3.0, ResourceUsage::High).is_ok());
        assert!(matches!(
            Task::new("Train model", 0.0, ResourceUsage::High),
            Err(Error::ValidationError(_))
        ));
        assert!(matches!(
            Task::new("Train model", -1.5, ResourceUsage::Low),
            Err(Error::ValidationError(_))
        ));
        assert!(matches!(
            Task::new("Train model", f64::NAN, ResourceUsage::Low),
            Err(Error::ValidationError(_))
        ));
        assert!(matches!(
            Task::new("   ", 1.0, ResourceUsage::Low),
            Err(Error::ValidationError(_))
        ));
    }

    #[test]
    fn test_duration_bounds() {
        assert!(Task::new("Tick", MIN_DURATION_HOURS, ResourceUsage::Low).is_ok());
        assert!(Task::new("Archive", MAX_DURATION_HOURS, ResourceUsage::Low).is_ok());
        assert!(matches!(
            Task::new("Forever", 1e10, ResourceUsage::Low),
            Err(Error::ValidationError(_))
        ));
        assert!(matches!(
            Task::new("Blink", 1e-9, ResourceUsage::Low),
            Err(Error::ValidationError(_))
        ));
    }

    #[test]
    fn test_scheduled_end_saturates() {
        let mut task = Task::new("Backup", 1.0, ResourceUsage::Low).unwrap();
        task.duration_hours = 1e12;
        let job = Job::from_draft(
            JobId(1),
            JobDraft {
                task,
                created_at: Utc::now(),
                carbon_intensity: 400.0,
                scheduled_time: Utc::now(),
                expected_intensity: 400.0,
                carbon_saved: 0.0,
                confidence_score: 0.3,
                reasoning: "now".to_string(),
                alternative_windows: vec![],
            },
        );
        assert_eq!(job.scheduled_end(), DateTime::<Utc>::MAX_UTC);
    }

    #[test]
    fn test_resource_usage_parsing() {
        assert_eq!(
            "very-high".parse::<ResourceUsage>().unwrap(),
            ResourceUsage::VeryHigh
        );
        assert_eq!("HIGH".parse::<ResourceUsage>().unwrap(), ResourceUsage::High);
        assert!("GPU-heavy".parse::<ResourceUsage>().is_err());
    }

    #[test]
    fn test_resource_usage_serde() {
        let json = serde_json::to_string(&ResourceUsage::VeryHigh).unwrap();
        assert_eq!(json, "\"very-high\"");
        let parsed: ResourceUsage = serde_json::from_str("\"medium\"").unwrap();
        assert_eq!(parsed, ResourceUsage::Medium);
    }

    #[test]
    fn test_job_serializes_flat_task() {
        let now = Utc::now();
        let job = Job::from_draft(
            JobId(7),
            JobDraft {
                task: Task::new("Backup", 1.5, ResourceUsage::Low).unwrap(),
                created_at: now,
                carbon_intensity: 400.0,
                scheduled_time: now,
                expected_intensity: 400.0,
                carbon_saved: 0.0,
                confidence_score: 0.3,
                reasoning: "now".to_string(),
                alternative_windows: vec![],
            },
        );

        let value = serde_json::to_value(&job).unwrap();
        assert_eq!(value["id"], 7);
        assert_eq!(value["task_name"], "Backup");
        assert_eq!(value["resource_usage"], "low");
        assert_eq!(value["status"], "pending");
        assert_eq!(
            job.scheduled_end() - job.scheduled_time,
            chrono::Duration::minutes(90)
        );
    }
}
