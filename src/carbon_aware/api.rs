//! Grid intensity feed integration

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::carbon_aware::provider::CarbonIntensityProvider;
use crate::carbon_aware::types::{CarbonDataPoint, CarbonReading, DataSource, Horizon, DEFAULT_UNIT};
use crate::config::GridFeedConfig;
use crate::{Error, Result};

/// Raw forecast payload returned by the feed
#[derive(Debug, Deserialize)]
struct ForecastPayload {
    region: Option<String>,
    unit: Option<String>,
    #[serde(default)]
    data: Vec<FeedPoint>,
}

#[derive(Debug, Deserialize)]
struct FeedPoint {
    point_time: String,
    value: f64,
}

/// HTTP client for an external grid-intensity forecast feed
#[derive(Clone)]
pub struct GridFeedProvider {
    client: Client,
    base_url: String,
    token: String,
}

impl GridFeedProvider {
    pub fn new(config: &GridFeedConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()?;
        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
        })
    }

    async fn fetch_forecast(&self, region: &str, horizon: Horizon) -> Result<CarbonReading> {
        let url = format!("{}/v3/forecast", self.base_url);

        let mut request = self.client.get(&url).query(&[
            ("region", region.to_string()),
            ("horizon_hours", horizon.hours.to_string()),
        ]);
        if !self.token.is_empty() {
            request = request.bearer_auth(&self.token);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(Error::DataUnavailable(format!(
                "grid feed returned {}",
                response.status()
            )));
        }

        let payload: ForecastPayload = response.json().await?;
        let reading = parse_payload(region, horizon, payload)?;

        info!(
            "Fetched {} forecast points for {} from grid feed",
            reading.forecast.len(),
            reading.location
        );
        Ok(reading)
    }
}

fn parse_payload(region: &str, horizon: Horizon, payload: ForecastPayload) -> Result<CarbonReading> {
    let unit = payload.unit.unwrap_or_else(|| DEFAULT_UNIT.to_string());
    let horizon_end = horizon.end();

    let mut points: Vec<CarbonDataPoint> = Vec::with_capacity(payload.data.len());
    for item in payload.data {
        if !item.value.is_finite() || item.value < 0.0 {
            warn!(
                "Dropping invalid intensity {} at {}",
                item.value, item.point_time
            );
            continue;
        }
        let timestamp = match DateTime::parse_from_rfc3339(&item.point_time) {
            Ok(dt) => dt.with_timezone(&Utc),
            Err(e) => {
                warn!("Failed to parse datetime '{}': {}", item.point_time, e);
                continue;
            }
        };
        if timestamp > horizon_end {
            continue;
        }
        points.push(CarbonDataPoint {
            timestamp,
            carbon_intensity: item.value,
            unit: unit.clone(),
            source: DataSource::Real,
        });
    }
    points.sort_by_key(|p| p.timestamp);

    // The point in effect at request time is the baseline. Anything that
    // stopped applying before then is history and is not forecast.
    let current = points
        .iter()
        .rposition(|p| p.timestamp <= horizon.start)
        .unwrap_or(0);
    let forecast = points.split_off(current);

    let mut baseline = forecast
        .first()
        .cloned()
        .ok_or_else(|| Error::DataUnavailable("grid feed returned no usable points".to_string()))?;
    if baseline.timestamp < horizon.start {
        baseline.timestamp = horizon.start;
    }
    if current > 0 {
        debug!("Dropped {} historical points before {}", current, horizon.start);
    }

    Ok(CarbonReading {
        location: payload.region.unwrap_or_else(|| region.to_string()),
        baseline,
        forecast,
    })
}

#[async_trait]
impl CarbonIntensityProvider for GridFeedProvider {
    fn name(&self) -> &str {
        "grid-feed"
    }

    async fn fetch(&self, region: &str, horizon: Horizon) -> Result<CarbonReading> {
        self.fetch_forecast(region, horizon).await.map_err(|e| match e {
            Error::DataUnavailable(_) => e,
            other => Error::DataUnavailable(other.to_string()),
        })
    }
}
