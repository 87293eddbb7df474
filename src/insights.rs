//! Deterministic operator insights and the savings analysis block
//!
//! The text depends only on the task, the reading and the recommendation, so
//! repeated requests with the same inputs produce the same insights.

use serde::Serialize;

use crate::carbon_aware::{CarbonReading, DataSource};
use crate::jobs::{ResourceUsage, Task};
use crate::recommendation::Recommendation;

/// Headline numbers comparing the chosen window with running now
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Analysis {
    pub baseline_intensity: f64,
    pub optimized_intensity: f64,
    /// `baseline - optimized`, never negative
    pub carbon_difference: f64,
    pub money_saved: f64,
    pub unit: String,
}

impl Analysis {
    pub fn new(reading: &CarbonReading, recommendation: &Recommendation) -> Self {
        let baseline = reading.baseline.carbon_intensity;
        Self {
            baseline_intensity: baseline,
            optimized_intensity: recommendation.expected_intensity,
            carbon_difference: (baseline - recommendation.expected_intensity).max(0.0),
            money_saved: recommendation.sustainability_impact.energy_cost_savings,
            unit: reading.baseline.unit.clone(),
        }
    }
}

/// Grid load bands in gCO2/kWh
fn grid_condition(intensity: f64) -> &'static str {
    match intensity {
        i if i < 150.0 => "very clean",
        i if i < 300.0 => "moderately clean",
        i if i < 500.0 => "carbon-intensive",
        _ => "highly carbon-intensive",
    }
}

fn tier_advice(usage: ResourceUsage) -> &'static str {
    match usage {
        ResourceUsage::Low => {
            "Light workloads gain little from aggressive tuning. Batch them with other \
             low-priority jobs in the same window so idle capacity is not powered up separately."
        }
        ResourceUsage::Medium => {
            "Right-size the allocation before the window opens and let frequency scaling \
             idle unused cores. Checkpointing lets the job resume in a later clean window \
             if it is preempted."
        }
        ResourceUsage::High => {
            "Keep accelerators saturated rather than partially busy: larger batches and \
             mixed precision shorten runtime, which keeps the job inside the clean window."
        }
        ResourceUsage::VeryHigh => {
            "At this power draw the start time dominates the footprint. Split the job into \
             checkpointed stages so each stage can follow the lowest-intensity hours, and \
             cap power where throughput loss is acceptable."
        }
    }
}

/// Multi-paragraph insights for a scheduled task
pub fn generate(task: &Task, reading: &CarbonReading, recommendation: &Recommendation) -> String {
    let baseline = &reading.baseline;
    let source_note = match reading.source() {
        DataSource::Real => "",
        DataSource::Simulated => " These figures come from simulated grid data.",
    };

    let context = format!(
        "The {} grid is currently {} at {:.1} {}. '{}' needs {:.1} hours on a {} resource profile.{}",
        reading.location,
        grid_condition(baseline.carbon_intensity),
        baseline.carbon_intensity,
        baseline.unit,
        task.task_name,
        task.duration_hours,
        task.resource_usage,
        source_note,
    );

    let timing = if recommendation.carbon_savings_estimate > 0.0 {
        format!(
            "Deferring the start to {} UTC lowers the average intensity to {:.1} {} \
             ({:.1}% less), avoiding roughly {:.2} kg CO2.",
            recommendation.recommended_start_time.format("%Y-%m-%d %H:%M"),
            recommendation.expected_intensity,
            baseline.unit,
            recommendation.sustainability_impact.carbon_reduction_percentage,
            recommendation.carbon_savings_estimate,
        )
    } else {
        "No cleaner window is available in the forecast, so running now is the \
         lowest-carbon option."
            .to_string()
    };

    format!("{}\n\n{} {}", context, timing, tier_advice(task.resource_usage))
}
