//! Recommendation output types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::sustainability::SustainabilityImpact;

/// A candidate execution window
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct RecommendationWindow {
    pub start_time: DateTime<Utc>,
    /// Time-weighted average intensity over the window
    pub expected_intensity: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// The chosen window plus everything derived from it
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Recommendation {
    pub recommended_start_time: DateTime<Utc>,
    pub expected_intensity: f64,
    /// kg CO2 avoided compared to running at baseline, never negative
    pub carbon_savings_estimate: f64,
    /// In [0, 1]
    pub confidence_score: f64,
    /// Set when the forecast did not cover the whole task duration
    pub low_confidence: bool,
    pub reasoning: String,
    pub sustainability_impact: SustainabilityImpact,
    /// Strictly ascending by `expected_intensity`, all worse than the chosen window
    pub alternative_windows: Vec<RecommendationWindow>,
}
