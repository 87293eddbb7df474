//! Human-readable explanations for recommendations
//!
//! Text is built only from numbers the engine already computed, so the same
//! inputs always produce the same explanation.

use chrono::{DateTime, Timelike, Utc};

use crate::jobs::Task;

pub fn time_of_day(at: DateTime<Utc>) -> &'static str {
    match at.hour() {
        0..=4 => "overnight",
        5..=8 => "early morning",
        9..=11 => "late morning",
        12..=16 => "afternoon",
        17..=20 => "evening",
        _ => "late evening",
    }
}

fn reduction_percentage(baseline: f64, value: f64) -> f64 {
    if baseline > 0.0 {
        (baseline - value) / baseline * 100.0
    } else {
        0.0
    }
}

/// Partial-horizon note appended to low-confidence explanations
fn coverage_note(covered_hours: f64, requested_hours: f64) -> String {
    format!(
        " The forecast only covers {:.1} of the {:.1} requested hours, so this estimate is low-confidence.",
        covered_hours, requested_hours
    )
}

pub struct ChosenWindow<'a> {
    pub task: &'a Task,
    pub start: DateTime<Utc>,
    pub expected: f64,
    pub baseline: f64,
    pub unit: &'a str,
    pub kg_saved: f64,
    /// `(covered, requested)` hours when the horizon was too short
    pub partial_coverage: Option<(f64, f64)>,
}

pub fn explain_window(w: &ChosenWindow<'_>) -> String {
    let mut text = format!(
        "Starting '{}' at {} UTC ({}) runs it while the grid averages {:.1} {} over {:.1} hours, \
         {:.1}% below the current {:.1} {}. For a {} resource profile this avoids about {:.2} kg CO2.",
        w.task.task_name,
        w.start.format("%Y-%m-%d %H:%M"),
        time_of_day(w.start),
        w.expected,
        w.unit,
        w.task.duration_hours,
        reduction_percentage(w.baseline, w.expected),
        w.baseline,
        w.unit,
        w.task.resource_usage,
        w.kg_saved,
    );
    if let Some((covered, requested)) = w.partial_coverage {
        text.push_str(&coverage_note(covered, requested));
    }
    text
}

pub fn explain_run_now(
    task: &Task,
    baseline: f64,
    best_forecast: f64,
    unit: &str,
    partial_coverage: Option<(f64, f64)>,
) -> String {
    let mut text = format!(
        "No forecast window beats the current intensity of {:.1} {} (best window averages {:.1} {}), \
         so '{}' should run now; delaying it would not reduce emissions.",
        baseline, unit, best_forecast, unit, task.task_name,
    );
    if let Some((covered, requested)) = partial_coverage {
        text.push_str(&coverage_note(covered, requested));
    }
    text
}

pub fn explain_unavailable(task: &Task, baseline: f64, unit: &str) -> String {
    format!(
        "No carbon intensity forecast is available, so '{}' is scheduled now at the current \
         intensity of {:.1} {}. No savings are claimed.",
        task.task_name, baseline, unit,
    )
}

pub fn alternative_reason(
    start: DateTime<Utc>,
    average: f64,
    recommended: f64,
    baseline: f64,
    unit: &str,
) -> String {
    let reduction = reduction_percentage(baseline, average);
    if reduction > 0.0 {
        format!(
            "{} window averaging {:.1} {}: {:.1} above the recommended window, still {:.1}% below current",
            capitalize(time_of_day(start)),
            average,
            unit,
            average - recommended,
            reduction,
        )
    } else {
        format!(
            "{} window averaging {:.1} {}: {:.1} above the recommended window, no cleaner than running now",
            capitalize(time_of_day(start)),
            average,
            unit,
            average - recommended,
        )
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::ResourceUsage;
    use chrono::TimeZone;

    #[test]
    fn test_time_of_day_buckets() {
        let at = |h| Utc.with_ymd_and_hms(2026, 1, 1, h, 0, 0).unwrap();
        assert_eq!(time_of_day(at(2)), "overnight");
        assert_eq!(time_of_day(at(6)), "early morning");
        assert_eq!(time_of_day(at(14)), "afternoon");
        assert_eq!(time_of_day(at(23)), "late evening");
    }

    #[test]
    fn test_explanation_is_deterministic() {
        let task = Task::new("Train model", 3.0, ResourceUsage::High).unwrap();
        let window = ChosenWindow {
            task: &task,
            start: Utc.with_ymd_and_hms(2026, 1, 1, 6, 0, 0).unwrap(),
            expected: 200.0,
            baseline: 500.0,
            unit: "gCO2/kWh",
            kg_saved: 0.9,
            partial_coverage: None,
        };
        let a = explain_window(&window);
        assert_eq!(a, explain_window(&window));
        assert!(a.contains("60.0% below"));
        assert!(a.contains("early morning"));
        assert!(a.contains("0.90 kg"));
        assert!(!a.contains("low-confidence"));
    }

    #[test]
    fn test_partial_coverage_is_mentioned() {
        let task = Task::new("Render", 10.0, ResourceUsage::Medium).unwrap();
        let text = explain_run_now(&task, 300.0, 320.0, "gCO2/kWh", Some((4.0, 10.0)));
        assert!(text.contains("run now"));
        assert!(text.contains("4.0 of the 10.0"));
    }

    #[test]
    fn test_alternative_reason() {
        let start = Utc.with_ymd_and_hms(2026, 1, 1, 21, 0, 0).unwrap();
        let reason = alternative_reason(start, 260.0, 200.0, 500.0, "gCO2/kWh");
        assert!(reason.starts_with("Late evening"));
        assert!(reason.contains("48.0% below current"));

        let reason = alternative_reason(start, 520.0, 200.0, 500.0, "gCO2/kWh");
        assert!(reason.contains("no cleaner than running now"));
    }
}
