//! Prometheus Metrics Definitions
//!
//! Defines all ROSTER metrics with appropriate labels and types.
//! Exposes a /metrics endpoint for Prometheus scraping.

use axum::{http::StatusCode, response::IntoResponse};
use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_histogram_vec, CounterVec, Encoder, HistogramVec, TextEncoder,
};

use crate::error::{ApiError, ApiResult};

/// HTTP request latency buckets (seconds)
/// Covers: 1ms, 5ms, 10ms, 25ms, 50ms, 100ms, 250ms, 500ms, 1s, 2.5s, 5s, 10s
const HTTP_LATENCY_BUCKETS: &[f64] = &[
    0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.0, 2.5, 5.0, 10.0,
];

/// Store operation latency buckets (seconds)
const DB_LATENCY_BUCKETS: &[f64] =
    &[0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.0, 2.5, 5.0];

/// Global metrics instance - initialized once at startup
pub static METRICS: Lazy<ApiResult<RosterMetrics>> = Lazy::new(RosterMetrics::new);

/// The registered metrics, or `None` if registration failed.
///
/// Recording is best effort; a failed registration is logged once by the
/// caller that first notices it and never fails a request.
pub fn metrics() -> Option<&'static RosterMetrics> {
    METRICS.as_ref().ok()
}

/// Container for all ROSTER metrics.
#[derive(Clone)]
pub struct RosterMetrics {
    /// HTTP request counter - labels: method, path, status
    pub http_requests_total: CounterVec,

    /// HTTP request duration histogram - labels: method, path
    pub http_request_duration_seconds: HistogramVec,

    /// Store operation counter - labels: operation, status
    pub db_operations_total: CounterVec,

    /// Store operation duration histogram - labels: operation
    pub db_operation_duration_seconds: HistogramVec,

    /// Cache lookups - labels: result (hit/miss)
    pub cache_lookups_total: CounterVec,
}

impl RosterMetrics {
    /// Create and register all metrics with Prometheus.
    pub fn new() -> ApiResult<Self> {
        Ok(Self {
            http_requests_total: register_counter_vec!(
                "roster_http_requests_total",
                "Total number of HTTP requests",
                &["method", "path", "status"]
            )
            .map_err(|e| ApiError::internal_error(format!("Failed to register http_requests_total: {}", e)))?,

            http_request_duration_seconds: register_histogram_vec!(
                "roster_http_request_duration_seconds",
                "HTTP request duration in seconds",
                &["method", "path"],
                HTTP_LATENCY_BUCKETS.to_vec()
            )
            .map_err(|e| ApiError::internal_error(format!("Failed to register http_request_duration_seconds: {}", e)))?,

            db_operations_total: register_counter_vec!(
                "roster_db_operations_total",
                "Total number of employee store operations",
                &["operation", "status"]
            )
            .map_err(|e| ApiError::internal_error(format!("Failed to register db_operations_total: {}", e)))?,

            db_operation_duration_seconds: register_histogram_vec!(
                "roster_db_operation_duration_seconds",
                "Employee store operation duration in seconds",
                &["operation"],
                DB_LATENCY_BUCKETS.to_vec()
            )
            .map_err(|e| ApiError::internal_error(format!("Failed to register db_operation_duration_seconds: {}", e)))?,

            cache_lookups_total: register_counter_vec!(
                "roster_cache_lookups_total",
                "Employee cache lookups by result",
                &["result"]
            )
            .map_err(|e| ApiError::internal_error(format!("Failed to register cache_lookups_total: {}", e)))?,
        })
    }

    /// Record an HTTP request.
    pub fn record_http_request(&self, method: &str, path: &str, status: u16, duration_secs: f64) {
        let status_str = status.to_string();
        self.http_requests_total
            .with_label_values(&[method, path, &status_str])
            .inc();
        self.http_request_duration_seconds
            .with_label_values(&[method, path])
            .observe(duration_secs);
    }

    /// Record a lifecycle operation against the store.
    pub fn record_db_operation(&self, operation: &str, success: bool, duration_secs: f64) {
        let status = if success { "success" } else { "error" };
        self.db_operations_total
            .with_label_values(&[operation, status])
            .inc();
        self.db_operation_duration_seconds
            .with_label_values(&[operation])
            .observe(duration_secs);
    }

    /// Record a cache lookup.
    pub fn record_cache_lookup(&self, hit: bool) {
        let result = if hit { "hit" } else { "miss" };
        self.cache_lookups_total.with_label_values(&[result]).inc();
    }
}

/// Handler for GET /metrics endpoint.
///
/// Returns Prometheus text format metrics.
pub async fn metrics_handler() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    match encoder.encode(&metric_families, &mut buffer) {
        Ok(_) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            buffer,
        ),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode metrics");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [("content-type", "text/plain")],
                format!("Failed to encode metrics: {}", e).into_bytes(),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prometheus::core::Collector;

    #[test]
    fn test_metrics_creation() -> Result<(), String> {
        let metrics = METRICS
            .as_ref()
            .map_err(|e| format!("Metrics init failed: {}", e.message))?;
        assert!(!metrics.http_requests_total.desc().is_empty());
        Ok(())
    }

    #[test]
    fn test_record_http_request() -> Result<(), String> {
        let metrics = metrics().ok_or("metrics not registered")?;
        metrics.record_http_request("GET", "/api/v1/employee/{id}", 200, 0.015);
        Ok(())
    }

    #[test]
    fn test_record_db_operation() -> Result<(), String> {
        let metrics = metrics().ok_or("metrics not registered")?;
        metrics.record_db_operation("create", true, 0.005);
        metrics.record_db_operation("delete", false, 0.010);
        Ok(())
    }

    #[test]
    fn test_cache_lookup_counts_by_result() -> Result<(), String> {
        let metrics = metrics().ok_or("metrics not registered")?;
        let before = metrics.cache_lookups_total.with_label_values(&["hit"]).get();
        metrics.record_cache_lookup(true);
        metrics.record_cache_lookup(false);
        let after = metrics.cache_lookups_total.with_label_values(&["hit"]).get();
        assert!(after >= before + 1.0);
        Ok(())
    }
}
