//! Low-carbon execution window selection

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use crate::carbon_aware::{CarbonDataPoint, DataSource};
use crate::config::{ImpactConfig, RecommendationConfig};
use crate::jobs::Task;
use crate::recommendation::reasoning::{self, ChosenWindow};
use crate::recommendation::{Recommendation, RecommendationWindow};
use crate::sustainability::ImpactCalculator;
use crate::{Error, Result};

/// Averages closer than this are treated as equal when ranking alternatives
const INTENSITY_EPSILON: f64 = 1e-6;

/// A forecast point together with the span it is taken to cover
#[derive(Clone, Debug)]
struct Segment {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    value: f64,
    simulated: bool,
}

/// Aggregate of the forecast over one candidate window
#[derive(Clone, Debug)]
struct WindowStats {
    start: DateTime<Utc>,
    covered_hours: f64,
    average: f64,
    points: usize,
    /// Time-weighted coefficient of variation
    variation: f64,
    simulated: bool,
}

pub struct RecommendationEngine {
    config: RecommendationConfig,
    impact: ImpactCalculator,
}

impl RecommendationEngine {
    pub fn new(config: RecommendationConfig, impact: ImpactConfig) -> Self {
        let impact = ImpactCalculator::new(impact, config.power_factors.clone());
        Self { config, impact }
    }

    /// Pick the lowest-carbon window for `task` in `forecast`.
    ///
    /// Returns `DataUnavailable` when the forecast has no usable point at or
    /// after the baseline timestamp.
    pub fn recommend(
        &self,
        task: &Task,
        baseline: &CarbonDataPoint,
        forecast: &[CarbonDataPoint],
    ) -> Result<Recommendation> {
        let now = baseline.timestamp;
        let segments = build_segments(forecast, now);
        let (first, last) = match (segments.first(), segments.last()) {
            (Some(first), Some(last)) => (first.start, last.end),
            _ => {
                return Err(Error::DataUnavailable(
                    "forecast has no points at or after the baseline".to_string(),
                ))
            }
        };

        let duration = task.duration();
        let mut windows: Vec<WindowStats> = candidate_starts(&segments, duration, first)
            .into_iter()
            .filter_map(|start| {
                let end = start.checked_add_signed(duration)?;
                if end > last {
                    return None;
                }
                evaluate(&segments, start, end)
            })
            .collect();

        // Horizon shorter than the task: use everything that is available
        let partial = windows.is_empty();
        if partial {
            windows.extend(evaluate(&segments, first, last));
        }
        if windows.is_empty() {
            return Err(Error::DataUnavailable(
                "forecast does not cover any window".to_string(),
            ));
        }

        windows.sort_by(|a, b| {
            a.average
                .total_cmp(&b.average)
                .then_with(|| a.start.cmp(&b.start))
        });
        let best = windows[0].clone();

        let coverage = (best.covered_hours / task.duration_hours).min(1.0);
        let confidence = self.confidence(&best, coverage);
        let partial_coverage = partial.then_some((best.covered_hours, task.duration_hours));
        let unit = baseline.unit.as_str();

        let recommendation = if best.average < baseline.carbon_intensity {
            let kg_saved = self.impact.kg_saved(
                baseline.carbon_intensity,
                best.average,
                task.duration_hours,
                task.resource_usage,
            );
            let reasoning = reasoning::explain_window(&ChosenWindow {
                task,
                start: best.start,
                expected: best.average,
                baseline: baseline.carbon_intensity,
                unit,
                kg_saved,
                partial_coverage,
            });
            Recommendation {
                recommended_start_time: best.start,
                expected_intensity: best.average,
                carbon_savings_estimate: kg_saved,
                confidence_score: confidence,
                low_confidence: partial,
                reasoning,
                sustainability_impact: self.impact.calculate(
                    baseline.carbon_intensity,
                    best.average,
                    task.duration_hours,
                    task.resource_usage,
                ),
                alternative_windows: self.alternatives(
                    &windows[1..],
                    best.start,
                    best.average,
                    baseline.carbon_intensity,
                    unit,
                ),
            }
        } else {
            // Nothing beats running now: collapse to the baseline
            Recommendation {
                recommended_start_time: now,
                expected_intensity: baseline.carbon_intensity,
                carbon_savings_estimate: 0.0,
                confidence_score: confidence,
                low_confidence: partial,
                reasoning: reasoning::explain_run_now(
                    task,
                    baseline.carbon_intensity,
                    best.average,
                    unit,
                    partial_coverage,
                ),
                sustainability_impact: Default::default(),
                alternative_windows: self.alternatives(
                    &windows,
                    now,
                    baseline.carbon_intensity,
                    baseline.carbon_intensity,
                    unit,
                ),
            }
        };

        debug!(
            "Recommended {} at {} ({:.1} vs baseline {:.1}, confidence {:.2}, {} alternative(s))",
            task.task_name,
            recommendation.recommended_start_time,
            recommendation.expected_intensity,
            baseline.carbon_intensity,
            recommendation.confidence_score,
            recommendation.alternative_windows.len()
        );
        Ok(recommendation)
    }

    /// Recommendation used when no forecast is available: run now, no savings
    pub fn run_now(&self, task: &Task, baseline: &CarbonDataPoint) -> Recommendation {
        Recommendation {
            recommended_start_time: baseline.timestamp,
            expected_intensity: baseline.carbon_intensity,
            carbon_savings_estimate: 0.0,
            confidence_score: self.config.fallback_confidence.clamp(0.0, 1.0),
            low_confidence: true,
            reasoning: reasoning::explain_unavailable(
                task,
                baseline.carbon_intensity,
                &baseline.unit,
            ),
            sustainability_impact: Default::default(),
            alternative_windows: Vec::new(),
        }
    }

    fn confidence(&self, window: &WindowStats, coverage: f64) -> f64 {
        let expected_points = window.covered_hours * self.config.points_per_hour_target;
        let density = if expected_points > 0.0 {
            (window.points as f64 / expected_points).min(1.0)
        } else {
            0.0
        };
        let variability = 1.0 / (1.0 + self.config.variance_weight.max(0.0) * window.variation);
        let source = if window.simulated {
            self.config.simulated_confidence_factor
        } else {
            1.0
        };

        let score = density * variability * coverage * source;
        if score.is_finite() {
            score.clamp(0.0, 1.0)
        } else {
            0.0
        }
    }

    /// Next-best windows: strictly worse than `floor`, strictly ascending,
    /// spaced apart from the chosen start and from each other
    fn alternatives(
        &self,
        ranked: &[WindowStats],
        chosen_start: DateTime<Utc>,
        floor: f64,
        baseline: f64,
        unit: &str,
    ) -> Vec<RecommendationWindow> {
        let spacing = Duration::minutes(self.config.alternative_spacing_minutes.max(0));
        let far_enough = |a: DateTime<Utc>, b: DateTime<Utc>| (a - b).abs() >= spacing;

        let mut accepted: Vec<RecommendationWindow> = Vec::new();
        let mut last = floor;
        for window in ranked {
            if accepted.len() >= self.config.max_alternatives {
                break;
            }
            if window.average <= last + INTENSITY_EPSILON {
                continue;
            }
            if window.start == chosen_start || !far_enough(window.start, chosen_start) {
                continue;
            }
            if accepted.iter().any(|w| !far_enough(window.start, w.start_time)) {
                continue;
            }
            accepted.push(RecommendationWindow {
                start_time: window.start,
                expected_intensity: window.average,
                reason: Some(reasoning::alternative_reason(
                    window.start,
                    window.average,
                    floor,
                    baseline,
                    unit,
                )),
            });
            last = window.average;
        }
        accepted
    }
}

/// Window starts worth evaluating over piecewise-constant data.
///
/// The optimum either begins on a segment boundary or ends on one, so each
/// segment contributes its start and the start that ends the window at its
/// end, never earlier than `first`.
fn candidate_starts(
    segments: &[Segment],
    duration: Duration,
    first: DateTime<Utc>,
) -> Vec<DateTime<Utc>> {
    let mut starts: Vec<DateTime<Utc>> = segments
        .iter()
        .flat_map(|s| {
            let end_aligned = s
                .end
                .checked_sub_signed(duration)
                .map(|t| t.max(first))
                .unwrap_or(first);
            [s.start, end_aligned]
        })
        .collect();
    starts.sort();
    starts.dedup();
    starts
}

fn hours_between(start: DateTime<Utc>, end: DateTime<Utc>) -> f64 {
    (end - start).num_milliseconds() as f64 / 3_600_000.0
}

/// Turn points into contiguous spans starting no earlier than `now`.
///
/// Each point covers up to the next point; the last covers one more step of
/// the preceding gap, or one hour when the series has a single point.
fn build_segments(forecast: &[CarbonDataPoint], now: DateTime<Utc>) -> Vec<Segment> {
    let mut points: Vec<&CarbonDataPoint> = forecast
        .iter()
        .filter(|p| p.carbon_intensity.is_finite() && p.carbon_intensity >= 0.0)
        .collect();
    points.sort_by_key(|p| p.timestamp);
    points.dedup_by_key(|p| p.timestamp);

    let last_step = match points.as_slice() {
        [.., a, b] => b.timestamp - a.timestamp,
        _ => Duration::hours(1),
    };

    points
        .iter()
        .enumerate()
        .filter_map(|(i, p)| {
            let end = points
                .get(i + 1)
                .map(|next| next.timestamp)
                .unwrap_or(p.timestamp + last_step);
            if end <= now {
                return None;
            }
            Some(Segment {
                start: p.timestamp.max(now),
                end,
                value: p.carbon_intensity,
                simulated: p.source == DataSource::Simulated,
            })
        })
        .collect()
}

/// Time-weighted statistics of the segments overlapping `[start, end)`
fn evaluate(segments: &[Segment], start: DateTime<Utc>, end: DateTime<Utc>) -> Option<WindowStats> {
    let mut weight_total = 0.0;
    let mut weighted_sum = 0.0;
    let mut points = 0;
    let mut simulated = false;
    let mut overlaps = Vec::new();

    for seg in segments {
        let overlap_start = seg.start.max(start);
        let overlap_end = seg.end.min(end);
        if overlap_end <= overlap_start {
            continue;
        }
        let weight = hours_between(overlap_start, overlap_end);
        weight_total += weight;
        weighted_sum += seg.value * weight;
        points += 1;
        simulated |= seg.simulated;
        overlaps.push((seg.value, weight));
    }

    if weight_total <= 0.0 {
        return None;
    }
    let average = weighted_sum / weight_total;
    let variance = overlaps
        .iter()
        .map(|(v, w)| w * (v - average).powi(2))
        .sum::<f64>()
        / weight_total;
    let variation = if average > 0.0 {
        variance.sqrt() / average
    } else {
        0.0
    };

    Some(WindowStats {
        start,
        covered_hours: weight_total,
        average,
        points,
        variation,
        simulated,
    })
}
