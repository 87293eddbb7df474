//! Types for carbon intensity readings and forecasts

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Default unit for every intensity value handled by the scheduler
pub const DEFAULT_UNIT: &str = "gCO2/kWh";

/// Where a data point came from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSource {
    Real,
    Simulated,
}

/// A single carbon intensity observation or prediction
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct CarbonDataPoint {
    pub timestamp: DateTime<Utc>,
    /// Intensity in `unit`, never negative
    pub carbon_intensity: f64,
    pub unit: String,
    pub source: DataSource,
}

impl CarbonDataPoint {
    pub fn new(timestamp: DateTime<Utc>, carbon_intensity: f64, source: DataSource) -> Self {
        Self {
            timestamp,
            carbon_intensity: carbon_intensity.max(0.0),
            unit: DEFAULT_UNIT.to_string(),
            source,
        }
    }
}

/// The time span a forecast is requested for
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Horizon {
    pub start: DateTime<Utc>,
    pub hours: u32,
    pub resolution_minutes: u32,
}

impl Horizon {
    pub fn new(start: DateTime<Utc>, hours: u32, resolution_minutes: u32) -> Self {
        Self {
            start,
            hours,
            resolution_minutes,
        }
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.start + Duration::hours(self.hours as i64)
    }

    /// Number of forecast points the horizon holds at its resolution
    pub fn steps(&self) -> usize {
        if self.resolution_minutes == 0 {
            return 0;
        }
        (self.hours as usize * 60) / self.resolution_minutes as usize
    }
}

/// Baseline reading plus forecast series for one region
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CarbonReading {
    pub location: String,
    pub baseline: CarbonDataPoint,
    /// Ordered by timestamp
    pub forecast: Vec<CarbonDataPoint>,
}

impl CarbonReading {
    /// `simulated` if any point in the reading is simulated
    pub fn source(&self) -> DataSource {
        let any_simulated = std::iter::once(&self.baseline)
            .chain(self.forecast.iter())
            .any(|p| p.source == DataSource::Simulated);
        if any_simulated {
            DataSource::Simulated
        } else {
            DataSource::Real
        }
    }

    /// Retag every point as simulated
    pub fn mark_simulated(mut self) -> Self {
        self.baseline.source = DataSource::Simulated;
        for point in &mut self.forecast {
            point.source = DataSource::Simulated;
        }
        self
    }
}
