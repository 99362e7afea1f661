//! Metrics definitions for the Showtimes API.
//!
//! All metrics follow Prometheus naming conventions:
//! - `showtime_` prefix
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Cardinality
//!
//! Labels are bounded:
//! - `method`: HTTP methods
//! - `endpoint`: the handful of routes below, everything else is `/other`
//! - `outcome`: `success` or an `ApiError::kind()` value
//! - `status`: `success`, `stale`, `error`

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Install the global Prometheus recorder and return the handle used to
/// serve `/metrics`.
///
/// Must be called before any metrics are recorded.
///
/// # Errors
///
/// Returns an error if a recorder is already installed in this process.
pub fn init_metrics_recorder() -> Result<PrometheusHandle, String> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Prefix("showtime_http_request".to_string()),
            &[
                0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.000, 2.500, 5.000, 10.000,
            ],
        )
        .map_err(|e| format!("Failed to set HTTP request buckets: {e}"))?
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus recorder: {e}"))
}

/// Record HTTP request completion.
///
/// Metric: `showtime_http_requests_total`, `showtime_http_request_duration_seconds`
/// Labels: `method`, `endpoint`, `status`
pub fn record_http_request(method: &str, endpoint: &str, status_code: u16, duration: Duration) {
    let normalized_endpoint = normalize_endpoint(endpoint);
    let status = categorize_status_code(status_code);

    histogram!("showtime_http_request_duration_seconds",
        "method" => method.to_string(),
        "endpoint" => normalized_endpoint,
        "status" => status
    )
    .record(duration.as_secs_f64());

    counter!("showtime_http_requests_total",
        "method" => method.to_string(),
        "endpoint" => normalized_endpoint,
        "status_code" => status_code.to_string()
    )
    .increment(1);
}

/// Record the outcome of one pass through the request authorizer.
///
/// Metric: `showtime_auth_outcomes_total`
/// Labels: `outcome`
pub fn record_auth_outcome(outcome: &'static str) {
    counter!("showtime_auth_outcomes_total", "outcome" => outcome).increment(1);
}

/// Record a key-set fetch attempt.
///
/// Metric: `showtime_jwks_fetch_total`
/// Labels: `status` (`success`, `stale`, `error`)
pub fn record_jwks_fetch(status: &'static str) {
    counter!("showtime_jwks_fetch_total", "status" => status).increment(1);
}

/// Record a request rejected by the rate limiter.
///
/// Metric: `showtime_rate_limited_total`
pub fn record_rate_limited() {
    counter!("showtime_rate_limited_total").increment(1);
}

/// Categorize HTTP status code into success/error/timeout
fn categorize_status_code(status_code: u16) -> &'static str {
    match status_code {
        200..=299 => "success",
        408 | 504 => "timeout",
        _ => "error",
    }
}

/// Normalize endpoint path to prevent label cardinality explosion
fn normalize_endpoint(path: &str) -> &'static str {
    match path {
        "/health" => "/health",
        "/metrics" => "/metrics",
        "/api/me" => "/api/me",
        "/api/movies/search" => "/api/movies/search",
        _ if path.starts_with("/api/movies/") && path.matches('/').count() == 3 => {
            "/api/movies/{id}"
        }
        _ => "/other",
    }
}
