/// Freshness-gated forecast cache over a durable record store
use crate::clock::Clock;
use crate::store::RecordStore;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::warn;

/// Namespace prefix applied to every key so cached records cannot collide
/// with unrelated data in a shared store.
pub const KEY_PREFIX: &str = "weatherapp:";

/// Fixed key mirroring the most recent successful fetch, consulted by the
/// explicit "load last known result" action independent of coordinates.
pub const LAST_FORECAST_KEY: &str = "lastForecast";

/// A stored record: the upstream response body verbatim, stamped at write
/// time by the injected clock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheRecord {
    pub saved_at_ms: i64,
    pub payload: Value,
}

pub struct ForecastCache {
    store: Arc<dyn RecordStore>,
    clock: Arc<dyn Clock>,
    max_age_minutes: i64,
    coord_precision: usize,
    strict_clock_skew: bool,
}

impl ForecastCache {
    pub fn new(
        store: Arc<dyn RecordStore>,
        clock: Arc<dyn Clock>,
        max_age_minutes: i64,
        coord_precision: usize,
        strict_clock_skew: bool,
    ) -> Self {
        Self {
            store,
            clock,
            max_age_minutes,
            coord_precision,
            strict_clock_skew,
        }
    }

    /// Cache key for a coordinate pair. Coordinates are rounded to the
    /// configured precision (3 decimals by default, ~111 m) so nearby
    /// requests share an entry.
    pub fn coord_key(&self, lat: f64, lon: f64) -> String {
        format!(
            "forecast:{:.prec$},{:.prec$}",
            lat,
            lon,
            prec = self.coord_precision
        )
    }

    /// Reads a record. Unparsable or missing records are a miss, never an
    /// error; the next successful write overwrites whatever is there.
    pub fn get(&self, key: &str) -> Option<CacheRecord> {
        let raw = self.store.load(&format!("{}{}", KEY_PREFIX, key))?;
        serde_json::from_str(&raw).ok()
    }

    /// Writes a record stamped with the current clock, unconditionally
    /// overwriting any existing record for the key.
    pub fn put(&self, key: &str, payload: &Value) {
        let record = CacheRecord {
            saved_at_ms: self.clock.now_ms(),
            payload: payload.clone(),
        };

        let raw = match serde_json::to_string(&record) {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Failed to serialize cache record for '{}': {}", key, e);
                return;
            }
        };

        if let Err(e) = self.store.save(&format!("{}{}", KEY_PREFIX, key), &raw) {
            warn!("Failed to persist cache record for '{}': {}", key, e);
        }
    }

    /// A record is usable without refetching while its age is within the
    /// configured threshold. A record stamped in the future (negative age,
    /// clock skew) counts as fresh unless strict skew handling is enabled.
    pub fn is_fresh(&self, saved_at_ms: i64) -> bool {
        let age_ms = self.clock.now_ms() - saved_at_ms;

        if self.strict_clock_skew && age_ms < 0 {
            return false;
        }

        age_ms <= self.max_age_minutes * 60_000
    }

    /// Freshness-gated read used on the forecast path.
    pub fn get_fresh(&self, key: &str) -> Option<Value> {
        if let Some(record) = self.get(key) {
            if self.is_fresh(record.saved_at_ms) {
                crate::metrics::METRICS.cache_hits_total.inc();
                return Some(record.payload);
            }
        }

        crate::metrics::METRICS.cache_misses_total.inc();
        None
    }

    /// Returns the most recent successful fetch regardless of age. Backs the
    /// explicit user action, so staleness is the caller's decision here.
    pub fn load_last(&self) -> Option<Value> {
        self.get(LAST_FORECAST_KEY).map(|record| record.payload)
    }
}
