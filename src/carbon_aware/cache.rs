//! Read-mostly forecast cache
//!
//! The cache holds an immutable [`ForecastSnapshot`] behind an `Arc`. A refresh
//! builds a complete new snapshot off to the side and publishes it by swapping
//! the pointer, so readers always see a whole old or a whole new snapshot.
//! Only one refresh runs at a time; within it, regions are fetched concurrently.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::carbon_aware::provider::CarbonIntensityProvider;
use crate::carbon_aware::types::{CarbonReading, Horizon};
use crate::Result;

#[derive(Clone, Debug)]
pub struct CachedReading {
    pub reading: CarbonReading,
    pub fetched_at: DateTime<Utc>,
}

/// One published generation of cached readings, keyed by region
#[derive(Clone, Debug, Default)]
pub struct ForecastSnapshot {
    pub generation: u64,
    pub readings: HashMap<String, CachedReading>,
}

pub struct ForecastCache {
    inner: Arc<dyn CarbonIntensityProvider>,
    snapshot: RwLock<Arc<ForecastSnapshot>>,
    writer: Mutex<()>,
    max_age: Duration,
}

impl ForecastCache {
    pub fn new(inner: Arc<dyn CarbonIntensityProvider>, max_age_minutes: i64) -> Self {
        Self {
            inner,
            snapshot: RwLock::new(Arc::new(ForecastSnapshot::default())),
            writer: Mutex::new(()),
            max_age: Duration::minutes(max_age_minutes),
        }
    }

    /// Current published snapshot
    pub async fn snapshot(&self) -> Arc<ForecastSnapshot> {
        self.snapshot.read().await.clone()
    }

    /// Fetch every region and publish the result as a new snapshot.
    ///
    /// Regions that fail keep their previous entry. Returns how many regions
    /// were refreshed.
    pub async fn refresh(&self, regions: &[String], horizon: Horizon) -> usize {
        let _writer = self.writer.lock().await;
        let previous = self.snapshot().await;

        let mut next = ForecastSnapshot {
            generation: previous.generation + 1,
            readings: HashMap::with_capacity(regions.len()),
        };
        let results = futures::future::join_all(
            regions
                .iter()
                .map(|region| self.inner.fetch(region, horizon)),
        )
        .await;

        let mut refreshed = 0;
        for (region, result) in regions.iter().zip(results) {
            match result {
                Ok(reading) => {
                    next.readings.insert(
                        region.clone(),
                        CachedReading {
                            reading,
                            fetched_at: horizon.start,
                        },
                    );
                    refreshed += 1;
                }
                Err(e) => {
                    warn!("Failed to refresh forecast for {}: {}", region, e);
                    if let Some(old) = previous.readings.get(region) {
                        next.readings.insert(region.clone(), old.clone());
                    }
                }
            }
        }

        *self.snapshot.write().await = Arc::new(next);
        debug!("Published forecast snapshot ({} region(s) refreshed)", refreshed);
        refreshed
    }

    /// Start background refresh
    pub fn start_refresh_loop(
        self: Arc<Self>,
        regions: Vec<String>,
        hours: u32,
        resolution_minutes: u32,
        interval: std::time::Duration,
    ) -> JoinHandle<()> {
        info!(
            "Started forecast refresh loop for {} region(s) every {:?}",
            regions.len(),
            interval
        );
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                let horizon = Horizon::new(Utc::now(), hours, resolution_minutes);
                self.refresh(&regions, horizon).await;
            }
        })
    }

    fn is_fresh(&self, cached: &CachedReading, now: DateTime<Utc>) -> bool {
        let age = now.signed_duration_since(cached.fetched_at);
        age >= Duration::zero() && age <= self.max_age
    }
}

#[async_trait]
impl CarbonIntensityProvider for ForecastCache {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn fetch(&self, region: &str, horizon: Horizon) -> Result<CarbonReading> {
        let snapshot = self.snapshot().await;
        if let Some(cached) = snapshot.readings.get(region) {
            if self.is_fresh(cached, horizon.start) {
                debug!("Serving {} forecast from cache", region);
                return Ok(cached.reading.clone());
            }
        }
        self.inner.fetch(region, horizon).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::carbon_aware::types::{CarbonDataPoint, DataSource};
    use crate::Error;
    use chrono::TimeZone;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Returns a flat series whose value is the call count, or fails when asked to
    struct Counting {
        calls: AtomicUsize,
        fail: std::sync::atomic::AtomicBool,
    }

    impl Counting {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail: std::sync::atomic::AtomicBool::new(false),
            }
        }
    }

    #[async_trait]
    impl CarbonIntensityProvider for Counting {
        fn name(&self) -> &str {
            "counting"
        }

        async fn fetch(&self, region: &str, horizon: Horizon) -> Result<CarbonReading> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(Error::DataUnavailable("down".to_string()));
            }
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            let point = CarbonDataPoint::new(horizon.start, n as f64, DataSource::Real);
            Ok(CarbonReading {
                location: region.to_string(),
                baseline: point.clone(),
                forecast: vec![point; 4],
            })
        }
    }

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 6, 1, hour, minute, 0).unwrap()
    }

    #[tokio::test]
    async fn test_fresh_snapshot_is_served() {
        let inner = Arc::new(Counting::new());
        let cache = ForecastCache::new(inner.clone(), 15);
        cache
            .refresh(&["DE".to_string()], Horizon::new(at(0, 0), 24, 60))
            .await;

        let reading = cache.fetch("DE", Horizon::new(at(0, 10), 24, 60)).await.unwrap();
        assert_eq!(reading.baseline.carbon_intensity, 1.0);
        assert_eq!(inner.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_stale_or_missing_region_goes_to_source() {
        let inner = Arc::new(Counting::new());
        let cache = ForecastCache::new(inner.clone(), 15);
        cache
            .refresh(&["DE".to_string()], Horizon::new(at(0, 0), 24, 60))
            .await;

        let stale = cache.fetch("DE", Horizon::new(at(1, 0), 24, 60)).await.unwrap();
        assert_eq!(stale.baseline.carbon_intensity, 2.0);

        let missing = cache.fetch("FR", Horizon::new(at(0, 5), 24, 60)).await.unwrap();
        assert_eq!(missing.baseline.carbon_intensity, 3.0);
    }

    #[tokio::test]
    async fn test_refresh_publishes_new_generation() {
        let inner = Arc::new(Counting::new());
        let cache = ForecastCache::new(inner.clone(), 15);
        let regions = vec!["DE".to_string(), "FR".to_string()];

        let before = cache.snapshot().await;
        assert_eq!(cache.refresh(&regions, Horizon::new(at(0, 0), 24, 60)).await, 2);
        let after = cache.snapshot().await;

        assert_eq!(before.generation, 0);
        assert!(before.readings.is_empty());
        assert_eq!(after.generation, 1);
        assert_eq!(after.readings.len(), 2);
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_previous_entries() {
        let inner = Arc::new(Counting::new());
        let cache = ForecastCache::new(inner.clone(), 15);
        let regions = vec!["DE".to_string()];
        cache.refresh(&regions, Horizon::new(at(0, 0), 24, 60)).await;

        inner.fail.store(true, Ordering::SeqCst);
        assert_eq!(cache.refresh(&regions, Horizon::new(at(0, 5), 24, 60)).await, 0);

        let snapshot = cache.snapshot().await;
        assert_eq!(snapshot.generation, 2);
        assert_eq!(snapshot.readings["DE"].reading.baseline.carbon_intensity, 1.0);
        assert_eq!(snapshot.readings["DE"].fetched_at, at(0, 0));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_readers_see_whole_snapshots() {
        let inner = Arc::new(Counting::new());
        let cache = Arc::new(ForecastCache::new(inner, 15));
        let regions: Vec<String> = (0..20).map(|i| format!("R{}", i)).collect();

        let reader = {
            let cache = cache.clone();
            tokio::spawn(async move {
                for _ in 0..200 {
                    let snapshot = cache.snapshot().await;
                    let len = snapshot.readings.len();
                    assert!(len == 0 || len == 20, "partial snapshot of {} entries", len);
                    tokio::task::yield_now().await;
                }
            })
        };
        for minute in 0..5 {
            cache
                .refresh(&regions, Horizon::new(at(0, minute), 24, 60))
                .await;
        }
        reader.await.unwrap();
    }
}
