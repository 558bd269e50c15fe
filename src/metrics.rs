use prometheus::{Counter, CounterVec, HistogramOpts, HistogramVec, Opts, Registry};
use std::sync::Arc;

/// Global metrics for the gateway
pub struct Metrics {
    pub registry: Registry,

    // Request metrics
    pub requests_total: CounterVec,
    pub request_duration_seconds: HistogramVec,

    // Upstream metrics
    pub upstream_errors_total: CounterVec,

    // Forecast cache metrics
    pub cache_hits_total: Counter,
    pub cache_misses_total: Counter,

    // Admission control metrics
    pub rate_limit_exceeded_total: CounterVec,
    pub quota_exhausted_total: CounterVec,
}

impl Metrics {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let requests_total = CounterVec::new(
            Opts::new("stratus_requests_total", "Total number of requests"),
            &["endpoint", "status"],
        )?;

        let request_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "stratus_request_duration_seconds",
                "Request duration in seconds",
            )
            .buckets(vec![0.001, 0.01, 0.1, 0.5, 1.0, 2.5, 5.0, 10.0]),
            &["endpoint"],
        )?;

        let upstream_errors_total = CounterVec::new(
            Opts::new(
                "stratus_upstream_errors_total",
                "Total number of failed upstream calls",
            ),
            &["upstream"],
        )?;

        let cache_hits_total = Counter::new(
            "stratus_cache_hits_total",
            "Total number of forecast cache hits",
        )?;

        let cache_misses_total = Counter::new(
            "stratus_cache_misses_total",
            "Total number of forecast cache misses",
        )?;

        let rate_limit_exceeded_total = CounterVec::new(
            Opts::new(
                "stratus_rate_limit_exceeded_total",
                "Total number of requests rejected by the window limiter",
            ),
            &["endpoint"],
        )?;

        let quota_exhausted_total = CounterVec::new(
            Opts::new(
                "stratus_quota_exhausted_total",
                "Total number of requests rejected by the daily quota",
            ),
            &["endpoint"],
        )?;

        registry.register(Box::new(requests_total.clone()))?;
        registry.register(Box::new(request_duration_seconds.clone()))?;
        registry.register(Box::new(upstream_errors_total.clone()))?;
        registry.register(Box::new(cache_hits_total.clone()))?;
        registry.register(Box::new(cache_misses_total.clone()))?;
        registry.register(Box::new(rate_limit_exceeded_total.clone()))?;
        registry.register(Box::new(quota_exhausted_total.clone()))?;

        Ok(Self {
            registry,
            requests_total,
            request_duration_seconds,
            upstream_errors_total,
            cache_hits_total,
            cache_misses_total,
            rate_limit_exceeded_total,
            quota_exhausted_total,
        })
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new().expect("Failed to create metrics")
    }
}

/// Global metrics instance
pub static METRICS: once_cell::sync::Lazy<Arc<Metrics>> =
    once_cell::sync::Lazy::new(|| Arc::new(Metrics::default()));
