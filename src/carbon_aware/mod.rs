//! Carbon intensity data for the scheduler
//!
//! A [`CarbonIntensityProvider`] supplies a baseline reading and a forecast
//! for a region. The real grid feed and the simulated generator implement the
//! same trait; configuration picks one, and the real feed is always wrapped in
//! a [`FallbackProvider`] so an outage degrades to simulated data instead of
//! failing the request.

pub mod api;
pub mod cache;
pub mod provider;
pub mod simulated;
pub mod types;

pub use api::GridFeedProvider;
pub use cache::{ForecastCache, ForecastSnapshot};
pub use provider::{build_provider, CarbonIntensityProvider, FallbackProvider};
pub use simulated::SimulatedProvider;
pub use types::{CarbonDataPoint, CarbonReading, DataSource, Horizon, DEFAULT_UNIT};
