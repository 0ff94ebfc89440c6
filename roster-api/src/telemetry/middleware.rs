//! Axum Middleware for HTTP Request Tracing and Metrics
//!
//! Wraps every request in a tracing span and records Prometheus request
//! counters and latency histograms.

use axum::{extract::Request, middleware::Next, response::Response};
use once_cell::sync::Lazy;
use regex::Regex;
use std::time::Instant;
use tracing::{info_span, Instrument};

use super::metrics::metrics;

#[allow(clippy::expect_used)]
static ID_SEGMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/\d+(/|$)").expect("static id regex is valid"));

/// Normalize path for metrics/spans (replace numeric ids with a placeholder).
///
/// This prevents high-cardinality label explosion in Prometheus.
pub(crate) fn normalize_path(path: &str) -> String {
    ID_SEGMENT.replace_all(path, "/{id}$1").into_owned()
}

/// Observability middleware for Axum.
///
/// This middleware wraps every request with:
/// 1. A `http_request` tracing span
/// 2. Prometheus metrics recording
/// 3. A completion log line
pub async fn observability_middleware(request: Request, next: Next) -> Response {
    let start = Instant::now();

    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let normalized_path = normalize_path(&path);

    let span = info_span!(
        "http_request",
        http.method = %method,
        http.target = %path,
        http.route = %normalized_path,
    );

    let response = next.run(request).instrument(span).await;

    let duration = start.elapsed();
    let status = response.status();

    if let Some(metrics) = metrics() {
        metrics.record_http_request(
            method.as_str(),
            &normalized_path,
            status.as_u16(),
            duration.as_secs_f64(),
        );
    }

    if status.is_server_error() {
        tracing::error!(
            method = %method,
            path = %path,
            status = status.as_u16(),
            duration_ms = duration.as_millis(),
            "Request failed"
        );
    } else {
        tracing::info!(
            method = %method,
            path = %path,
            status = status.as_u16(),
            duration_ms = duration.as_millis(),
            "Request completed"
        );
    }

    response
}
