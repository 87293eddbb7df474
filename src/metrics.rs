//! Prometheus metrics for the carbon-aware scheduler
//!
//! # Exported metrics
//! The `/metrics` endpoint (when built with `--features metrics`) exports:
//! - `carbon_schedule_requests_total` (counter): scheduling requests labeled by outcome.
//! - `carbon_provider_fallbacks_total` (counter): times the real feed failed and simulated data was used.
//! - `carbon_job_transitions_total` (counter): job status transitions labeled by from/to.
//! - `carbon_recommendation_confidence` (histogram): confidence score of each recommendation.

use std::sync::atomic::AtomicU64;

use once_cell::sync::Lazy;
use prometheus_client::encoding::EncodeLabelSet;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::histogram::{linear_buckets, Histogram};
use prometheus_client::registry::Registry;

use crate::jobs::JobStatus;
use crate::{Error, Result};

/// Labels for scheduling requests
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct ScheduleLabels {
    /// "scheduled", "low_confidence", "rejected" or "failed"
    pub outcome: String,
}

/// Labels for job status transitions
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct TransitionLabels {
    pub from: String,
    pub to: String,
}

pub static SCHEDULE_REQUESTS_TOTAL: Lazy<Family<ScheduleLabels, Counter<u64, AtomicU64>>> =
    Lazy::new(Family::default);

pub static PROVIDER_FALLBACKS_TOTAL: Lazy<Counter<u64, AtomicU64>> = Lazy::new(Counter::default);

pub static JOB_TRANSITIONS_TOTAL: Lazy<Family<TransitionLabels, Counter<u64, AtomicU64>>> =
    Lazy::new(Family::default);

/// Confidence in [0, 1], ten equal buckets
pub static RECOMMENDATION_CONFIDENCE: Lazy<Histogram> =
    Lazy::new(|| Histogram::new(linear_buckets(0.1, 0.1, 10)));

/// Global metrics registry; counters get their `_total` suffix on encode
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let mut registry = Registry::default();

    registry.register(
        "carbon_schedule_requests",
        "Total number of scheduling requests by outcome",
        SCHEDULE_REQUESTS_TOTAL.clone(),
    );
    registry.register(
        "carbon_provider_fallbacks",
        "Times the real carbon feed failed and simulated data was used",
        PROVIDER_FALLBACKS_TOTAL.clone(),
    );
    registry.register(
        "carbon_job_transitions",
        "Total number of job status transitions",
        JOB_TRANSITIONS_TOTAL.clone(),
    );
    registry.register(
        "carbon_recommendation_confidence",
        "Confidence score of produced recommendations",
        RECOMMENDATION_CONFIDENCE.clone(),
    );

    registry
});

pub fn record_schedule(outcome: &str) {
    let labels = ScheduleLabels {
        outcome: outcome.to_string(),
    };
    SCHEDULE_REQUESTS_TOTAL.get_or_create(&labels).inc();
}

pub fn record_provider_fallback() {
    PROVIDER_FALLBACKS_TOTAL.inc();
}

pub fn record_transition(from: JobStatus, to: JobStatus) {
    let labels = TransitionLabels {
        from: from.as_str().to_string(),
        to: to.as_str().to_string(),
    };
    JOB_TRANSITIONS_TOTAL.get_or_create(&labels).inc();
}

pub fn observe_confidence(score: f64) {
    RECOMMENDATION_CONFIDENCE.observe(score);
}

/// Render the registry in the Prometheus text format
pub fn encode() -> Result<String> {
    let mut buffer = String::new();
    prometheus_client::encoding::text::encode(&mut buffer, &REGISTRY)
        .map_err(|e| Error::Internal(format!("failed to encode metrics: {}", e)))?;
    Ok(buffer)
}
