/// Sliding-window rate limiter applied ahead of the daily quota
use crate::clock::Clock;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

/// Bounds each client to at most `max_requests` admissions within any
/// trailing window of `window_ms`. State lives in process memory with the
/// same restart semantics as the quota map.
pub struct RateLimiter {
    windows: Mutex<HashMap<String, VecDeque<i64>>>,
    max_requests: u32,
    window_ms: i64,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window_secs: u64, clock: Arc<dyn Clock>) -> Self {
        Self {
            windows: Mutex::new(HashMap::new()),
            max_requests,
            window_ms: window_secs as i64 * 1_000,
            clock,
        }
    }

    /// Admits the request unless the client already has `max_requests`
    /// admissions inside the trailing window. Only admitted requests occupy
    /// a slot; rejected ones leave the window untouched.
    pub fn admit(&self, client_id: &str) -> bool {
        let now = self.clock.now_ms();
        let mut windows = self.windows.lock().unwrap();

        let window = windows.entry(client_id.to_string()).or_default();

        // Drop admissions that have aged out of the trailing window.
        while let Some(&oldest) = window.front() {
            if now - oldest >= self.window_ms {
                window.pop_front();
            } else {
                break;
            }
        }

        if window.len() >= self.max_requests as usize {
            return false;
        }

        window.push_back(now);
        true
    }
}
