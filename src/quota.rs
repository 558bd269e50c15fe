/// Per-client daily allowance for the metered summary route
use crate::clock::Clock;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Outcome of a quota check. A denial carries zero remaining; an admission
/// reports how many requests the client has left today.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaDecision {
    pub allowed: bool,
    pub remaining: u32,
}

struct QuotaEntry {
    day: String,
    count: u32,
}

/// In-memory daily counters keyed by client id. State is owned by a single
/// process instance; a restart resets everyone's quota, and horizontal
/// scaling needs an external shared store behind the same interface.
pub struct DailyQuota {
    entries: Mutex<HashMap<String, QuotaEntry>>,
    daily_limit: u32,
    clock: Arc<dyn Clock>,
}

impl DailyQuota {
    pub fn new(daily_limit: u32, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            daily_limit,
            clock,
        }
    }

    /// Checks and consumes one slot for the client in a single step under
    /// the map lock, so concurrent bursts cannot lose or double-count
    /// updates. Day rollover is lazy: the stored day key is compared to the
    /// current one on each read, with no background sweep.
    pub fn consume(&self, client_id: &str) -> QuotaDecision {
        let today = day_key(self.clock.now_ms());
        let mut entries = self.entries.lock().unwrap();

        let entry = entries
            .entry(client_id.to_string())
            .or_insert_with(|| QuotaEntry {
                day: today.clone(),
                count: 0,
            });

        if entry.day != today {
            entry.day = today;
            entry.count = 0;
        }

        if entry.count >= self.daily_limit {
            return QuotaDecision {
                allowed: false,
                remaining: 0,
            };
        }

        entry.count += 1;

        QuotaDecision {
            allowed: true,
            remaining: self.daily_limit - entry.count,
        }
    }
}

/// Calendar-day key in UTC; the unit of quota reset.
fn day_key(now_ms: i64) -> String {
    chrono::DateTime::<chrono::Utc>::from_timestamp_millis(now_ms)
        .map(|dt| dt.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}
