//! Simulated carbon intensity source
//!
//! Generates a diurnal curve (lowest around 03:00 UTC, highest around 15:00
//! UTC) with bounded noise. The series is a pure function of the configured
//! seed, the region and the horizon: the RNG is seeded from a SHA-256 digest
//! of those inputs.

use std::f64::consts::PI;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Timelike, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sha2::{Digest, Sha256};

use crate::carbon_aware::provider::CarbonIntensityProvider;
use crate::carbon_aware::types::{CarbonDataPoint, CarbonReading, DataSource, Horizon};
use crate::config::SimulatedConfig;
use crate::{Error, Result};

/// Hour of day (UTC) at which the simulated grid is dirtiest
const PEAK_HOUR: f64 = 15.0;

#[derive(Clone, Debug)]
pub struct SimulatedProvider {
    config: SimulatedConfig,
}

impl SimulatedProvider {
    pub fn new(config: SimulatedConfig) -> Self {
        Self { config }
    }

    /// Generate the reading synchronously
    pub fn generate(&self, region: &str, horizon: Horizon) -> Result<CarbonReading> {
        if horizon.resolution_minutes == 0 {
            return Err(Error::DataUnavailable(
                "simulated horizon has zero resolution".to_string(),
            ));
        }

        let mut rng = StdRng::from_seed(self.seed_for(region, &horizon));
        let cfg = &self.config;
        let base = if cfg.base_max > cfg.base_min {
            rng.gen_range(cfg.base_min..cfg.base_max)
        } else {
            cfg.base_min
        };

        let step = Duration::minutes(horizon.resolution_minutes as i64);
        let mut forecast = Vec::with_capacity(horizon.steps());
        for i in 0..horizon.steps() {
            let timestamp = horizon.start + step * i as i32;
            let value = self.value_at(base, timestamp, &mut rng);
            forecast.push(CarbonDataPoint::new(timestamp, value, DataSource::Simulated));
        }

        let baseline = match forecast.first() {
            Some(first) => first.clone(),
            None => {
                let value = self.value_at(base, horizon.start, &mut rng);
                CarbonDataPoint::new(horizon.start, value, DataSource::Simulated)
            }
        };

        Ok(CarbonReading {
            location: region.to_string(),
            baseline,
            forecast,
        })
    }

    fn value_at(&self, base: f64, timestamp: DateTime<Utc>, rng: &mut StdRng) -> f64 {
        let cfg = &self.config;
        let hour = timestamp.hour() as f64 + timestamp.minute() as f64 / 60.0;
        let diurnal = cfg.amplitude * (2.0 * PI * (hour - PEAK_HOUR) / 24.0).cos();
        let noise = if cfg.noise > 0.0 {
            rng.gen_range(-cfg.noise..=cfg.noise)
        } else {
            0.0
        };
        (base + diurnal + noise).clamp(cfg.floor, cfg.ceiling)
    }

    fn seed_for(&self, region: &str, horizon: &Horizon) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(self.config.seed.to_le_bytes());
        hasher.update(region.as_bytes());
        hasher.update(horizon.start.timestamp().to_le_bytes());
        hasher.update(horizon.hours.to_le_bytes());
        hasher.update(horizon.resolution_minutes.to_le_bytes());
        hasher.finalize().into()
    }
}

#[async_trait]
impl CarbonIntensityProvider for SimulatedProvider {
    fn name(&self) -> &str {
        "simulated"
    }

    async fn fetch(&self, region: &str, horizon: Horizon) -> Result<CarbonReading> {
        self.generate(region, horizon)
    }
}
