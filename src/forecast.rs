/// Client-side forecast flow: advisory cache in front of a live source
use crate::cache::{ForecastCache, LAST_FORECAST_KEY};
use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// A live forecast upstream. The gateway's forecast route is one
/// implementation; anything returning the opaque forecast body works.
#[async_trait]
pub trait ForecastSource: Send + Sync {
    async fn fetch(&self, lat: f64, lon: f64) -> Result<Value>;
}

/// Ties the freshness cache to a live source. The cache is advisory: the
/// caller chooses per request whether to consult it, and a miss or stale
/// record always falls through to a live fetch followed by a write.
pub struct ForecastService {
    cache: ForecastCache,
    source: Arc<dyn ForecastSource>,
}

impl ForecastService {
    pub fn new(cache: ForecastCache, source: Arc<dyn ForecastSource>) -> Self {
        Self { cache, source }
    }

    pub async fn get(&self, lat: f64, lon: f64, use_cache: bool) -> Result<Value> {
        let key = self.cache.coord_key(lat, lon);

        if use_cache {
            if let Some(payload) = self.cache.get_fresh(&key) {
                debug!("Forecast cache hit for {}", key);
                return Ok(payload);
            }
        }

        let fresh = self.source.fetch(lat, lon).await?;

        self.cache.put(&key, &fresh);
        // Every successful live fetch also refreshes the fixed "last
        // successful result" record.
        self.cache.put(LAST_FORECAST_KEY, &fresh);

        Ok(fresh)
    }

    /// Explicit "load last known result" action; bypasses coordinates and
    /// the freshness gate entirely.
    pub fn load_last(&self) -> Option<Value> {
        self.cache.load_last()
    }
}
