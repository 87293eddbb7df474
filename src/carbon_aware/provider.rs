//! The carbon intensity provider capability and its fallback composition

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::carbon_aware::api::GridFeedProvider;
use crate::carbon_aware::simulated::SimulatedProvider;
use crate::carbon_aware::types::{CarbonReading, Horizon};
use crate::config::{ProviderConfig, ProviderKind};
use crate::{Error, Result};

/// Supplies a baseline reading and a forecast series for a region
#[async_trait]
pub trait CarbonIntensityProvider: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &str;

    /// Fetch baseline + forecast; failures are `DataUnavailable`
    async fn fetch(&self, region: &str, horizon: Horizon) -> Result<CarbonReading>;
}

/// Tries the primary source and falls back to the simulated one
pub struct FallbackProvider {
    primary: Arc<dyn CarbonIntensityProvider>,
    fallback: SimulatedProvider,
}

impl FallbackProvider {
    pub fn new(primary: Arc<dyn CarbonIntensityProvider>, fallback: SimulatedProvider) -> Self {
        Self { primary, fallback }
    }
}

#[async_trait]
impl CarbonIntensityProvider for FallbackProvider {
    fn name(&self) -> &str {
        self.primary.name()
    }

    async fn fetch(&self, region: &str, horizon: Horizon) -> Result<CarbonReading> {
        match self.primary.fetch(region, horizon).await {
            Ok(reading) => Ok(reading),
            Err(e) => {
                warn!(
                    "Carbon source '{}' unavailable for {}: {}; using simulated data",
                    self.primary.name(),
                    region,
                    e
                );
                #[cfg(feature = "metrics")]
                crate::metrics::record_provider_fallback();

                let reading = self.fallback.fetch(region, horizon).await.map_err(|e| {
                    Error::DataUnavailable(format!("simulated fallback failed: {}", e))
                })?;
                debug!(
                    "Simulated fallback produced {} forecast points",
                    reading.forecast.len()
                );
                Ok(reading.mark_simulated())
            }
        }
    }
}

/// Build the provider selected by configuration
pub fn build_provider(config: &ProviderConfig) -> Result<Arc<dyn CarbonIntensityProvider>> {
    let simulated = SimulatedProvider::new(config.simulated.clone());
    match config.kind {
        ProviderKind::Simulated => Ok(Arc::new(simulated)),
        ProviderKind::GridFeed => {
            let feed = GridFeedProvider::new(&config.grid_feed)?;
            Ok(Arc::new(FallbackProvider::new(Arc::new(feed), simulated)))
        }
    }
}
