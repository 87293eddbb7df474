//! Scheduler configuration
//!
//! Loaded from an optional TOML file. Every section has defaults so a partial
//! file (or no file at all) yields a usable configuration; CLI flags are
//! applied on top by the binary.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::jobs::ResourceUsage;
use crate::{Error, Result};

/// Top-level configuration
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub server: ServerConfig,
    pub provider: ProviderConfig,
    pub cache: CacheConfig,
    pub recommendation: RecommendationConfig,
    pub impact: ImpactConfig,
    pub dispatcher: DispatcherConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address the HTTP API binds to
    pub bind_addr: String,
    /// Prefix under which the contract routes are mounted in addition to `/`
    pub api_prefix: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8000".to_string(),
            api_prefix: "/api".to_string(),
        }
    }
}

/// Which carbon data source backs the scheduler
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ProviderKind {
    /// Deterministic diurnal-curve generator
    #[default]
    Simulated,
    /// External grid-intensity feed, falling back to the simulated source
    GridFeed,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub kind: ProviderKind,
    /// Grid region identifier passed to the data source
    pub region: String,
    /// Forecast horizon requested from the source
    pub horizon_hours: u32,
    /// Spacing of forecast points
    pub resolution_minutes: u32,
    pub grid_feed: GridFeedConfig,
    pub simulated: SimulatedConfig,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            kind: ProviderKind::default(),
            region: "CAISO_NORTH".to_string(),
            horizon_hours: 24,
            resolution_minutes: 15,
            grid_feed: GridFeedConfig::default(),
            simulated: SimulatedConfig::default(),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct GridFeedConfig {
    /// Base URL of the feed
    pub url: String,
    /// Bearer token, empty for none
    pub token: String,
    /// Request timeout; failures must resolve quickly so fallback stays cheap
    pub timeout_secs: u64,
}

impl Default for GridFeedConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            token: String::new(),
            timeout_secs: 5,
        }
    }
}

/// Shape of the simulated diurnal curve (gCO2/kWh)
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct SimulatedConfig {
    pub seed: u64,
    pub base_min: f64,
    pub base_max: f64,
    pub amplitude: f64,
    pub noise: f64,
    pub floor: f64,
    pub ceiling: f64,
}

impl Default for SimulatedConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            base_min: 300.0,
            base_max: 500.0,
            amplitude: 120.0,
            noise: 25.0,
            floor: 50.0,
            ceiling: 1200.0,
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    pub refresh_interval_secs: u64,
    /// Snapshots older than this are bypassed
    pub max_age_minutes: i64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            refresh_interval_secs: 300,
            max_age_minutes: 15,
        }
    }
}

/// Power draw per resource tier, in kW
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct PowerFactors {
    pub low: f64,
    pub medium: f64,
    pub high: f64,
    pub very_high: f64,
}

impl Default for PowerFactors {
    fn default() -> Self {
        Self {
            low: 0.3,
            medium: 0.6,
            high: 1.0,
            very_high: 1.5,
        }
    }
}

impl PowerFactors {
    pub fn factor(&self, usage: ResourceUsage) -> f64 {
        match usage {
            ResourceUsage::Low => self.low,
            ResourceUsage::Medium => self.medium,
            ResourceUsage::High => self.high,
            ResourceUsage::VeryHigh => self.very_high,
        }
    }

    fn validate(&self) -> Result<()> {
        let tiers = [self.low, self.medium, self.high, self.very_high];
        if tiers.iter().any(|f| !f.is_finite() || *f <= 0.0) {
            return Err(Error::ConfigError(
                "power factors must be positive".to_string(),
            ));
        }
        if tiers.windows(2).any(|w| w[0] >= w[1]) {
            return Err(Error::ConfigError(
                "power factors must increase from low to very_high".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct RecommendationConfig {
    /// Number of alternative windows returned (K)
    pub max_alternatives: usize,
    /// Minimum distance between the starts of any two returned windows
    pub alternative_spacing_minutes: i64,
    /// Point density that earns full density credit in the confidence score
    pub points_per_hour_target: f64,
    /// How strongly intensity variation inside a window lowers confidence
    pub variance_weight: f64,
    /// Confidence multiplier when the window is covered by simulated data
    pub simulated_confidence_factor: f64,
    /// Confidence reported when no forecast is available at all
    pub fallback_confidence: f64,
    pub power_factors: PowerFactors,
}

impl Default for RecommendationConfig {
    fn default() -> Self {
        Self {
            max_alternatives: 3,
            alternative_spacing_minutes: 60,
            points_per_hour_target: 1.0,
            variance_weight: 2.0,
            simulated_confidence_factor: 0.85,
            fallback_confidence: 0.3,
            power_factors: PowerFactors::default(),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct ImpactConfig {
    /// CO2 a mature tree absorbs per year
    pub tree_absorption_kg_per_year: f64,
    /// Monetary value assigned to each kg of CO2 avoided
    pub cost_per_kg_co2: f64,
    /// How often the task is expected to run per year when annualizing savings
    pub runs_per_year: f64,
}

impl Default for ImpactConfig {
    fn default() -> Self {
        Self {
            tree_absorption_kg_per_year: 21.77,
            cost_per_kg_co2: 0.05,
            runs_per_year: 1.0,
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct DispatcherConfig {
    pub enabled: bool,
    pub tick_secs: u64,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            tick_secs: 5,
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Emit JSON log lines instead of human-readable ones
    pub json: bool,
}

impl SchedulerConfig {
    /// Parse configuration from TOML text and validate it
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: SchedulerConfig = toml::from_str(raw)
            .map_err(|e| Error::ConfigError(format!("invalid configuration: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::ConfigError(format!("failed to read {}: {}", path.display(), e))
        })?;
        let config = Self::from_toml_str(&raw)?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.server.api_prefix.is_empty() && !self.server.api_prefix.starts_with('/') {
            return Err(Error::ConfigError(format!(
                "server.api_prefix must start with '/' (got '{}')",
                self.server.api_prefix
            )));
        }
        if self.provider.horizon_hours == 0 {
            return Err(Error::ConfigError(
                "provider.horizon_hours must be greater than 0".to_string(),
            ));
        }
        if self.provider.resolution_minutes == 0 {
            return Err(Error::ConfigError(
                "provider.resolution_minutes must be greater than 0".to_string(),
            ));
        }
        if self.provider.kind == ProviderKind::GridFeed && self.provider.grid_feed.url.is_empty() {
            return Err(Error::ConfigError(
                "provider.grid_feed.url is required for the grid-feed provider".to_string(),
            ));
        }
        let sim = &self.provider.simulated;
        if sim.base_min > sim.base_max || sim.floor > sim.ceiling {
            return Err(Error::ConfigError(
                "provider.simulated ranges are inverted".to_string(),
            ));
        }
        self.recommendation.power_factors.validate()?;
        if self.recommendation.points_per_hour_target <= 0.0 {
            return Err(Error::ConfigError(
                "recommendation.points_per_hour_target must be positive".to_string(),
            ));
        }
        if self.impact.tree_absorption_kg_per_year <= 0.0 {
            return Err(Error::ConfigError(
                "impact.tree_absorption_kg_per_year must be positive".to_string(),
            ));
        }
        if self.impact.cost_per_kg_co2 < 0.0 || self.impact.runs_per_year < 0.0 {
            return Err(Error::ConfigError(
                "impact rates must not be negative".to_string(),
            ));
        }
        Ok(())
    }
}
