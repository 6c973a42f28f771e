//! Prometheus Metrics Definitions
//!
//! Defines the HELIO metrics and the `/metrics` endpoint for scraping.

use axum::{http::StatusCode, response::IntoResponse};
use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_histogram_vec, CounterVec, Encoder, HistogramVec, TextEncoder,
};

use crate::error::{ApiError, ApiResult};

/// HTTP request latency buckets (seconds)
const HTTP_LATENCY_BUCKETS: &[f64] = &[
    0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.0, 2.5, 5.0, 10.0,
];

/// Render latency buckets (seconds); compiling a report is slower than serving one.
const RENDER_LATENCY_BUCKETS: &[f64] = &[0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.0, 2.5, 5.0];

/// Global metrics instance - initialized once at first use
pub static METRICS: Lazy<ApiResult<HelioMetrics>> = Lazy::new(HelioMetrics::new);

/// Container for all HELIO metrics.
#[derive(Clone)]
pub struct HelioMetrics {
    /// HTTP request counter - labels: method, path, status
    pub http_requests_total: CounterVec,

    /// HTTP request duration histogram - labels: method, path
    pub http_request_duration_seconds: HistogramVec,

    /// Report renders - labels: format, status (success/error)
    pub report_renders_total: CounterVec,

    /// Render duration histogram - labels: format
    pub report_render_duration_seconds: HistogramVec,

    /// Report cache lookups - labels: result (hit/miss)
    pub report_cache_lookups_total: CounterVec,

    /// Requests refused by the rate limiter - labels: route
    pub rate_limited_total: CounterVec,
}

impl HelioMetrics {
    /// Create and register all metrics with Prometheus.
    pub fn new() -> ApiResult<Self> {
        Ok(Self {
            http_requests_total: register_counter_vec!(
                "helio_http_requests_total",
                "Total number of HTTP requests",
                &["method", "path", "status"]
            )
            .map_err(|e| ApiError::internal_error(format!("Failed to register http_requests_total: {}", e)))?,

            http_request_duration_seconds: register_histogram_vec!(
                "helio_http_request_duration_seconds",
                "HTTP request duration in seconds",
                &["method", "path"],
                HTTP_LATENCY_BUCKETS.to_vec()
            )
            .map_err(|e| ApiError::internal_error(format!("Failed to register http_request_duration_seconds: {}", e)))?,

            report_renders_total: register_counter_vec!(
                "helio_report_renders_total",
                "Total number of report renders",
                &["format", "status"]
            )
            .map_err(|e| ApiError::internal_error(format!("Failed to register report_renders_total: {}", e)))?,

            report_render_duration_seconds: register_histogram_vec!(
                "helio_report_render_duration_seconds",
                "Report render duration in seconds",
                &["format"],
                RENDER_LATENCY_BUCKETS.to_vec()
            )
            .map_err(|e| ApiError::internal_error(format!("Failed to register report_render_duration_seconds: {}", e)))?,

            report_cache_lookups_total: register_counter_vec!(
                "helio_report_cache_lookups_total",
                "Report cache lookups by result",
                &["result"]
            )
            .map_err(|e| ApiError::internal_error(format!("Failed to register report_cache_lookups_total: {}", e)))?,

            rate_limited_total: register_counter_vec!(
                "helio_rate_limited_total",
                "Requests refused by the rate limiter",
                &["route"]
            )
            .map_err(|e| ApiError::internal_error(format!("Failed to register rate_limited_total: {}", e)))?,
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

    /// Record a report render.
    pub fn record_render(&self, format: &str, success: bool, duration_secs: f64) {
        let status = if success { "success" } else { "error" };
        self.report_renders_total
            .with_label_values(&[format, status])
            .inc();
        self.report_render_duration_seconds
            .with_label_values(&[format])
            .observe(duration_secs);
    }

    /// Record a report cache lookup.
    pub fn record_cache_lookup(&self, hit: bool) {
        let result = if hit { "hit" } else { "miss" };
        self.report_cache_lookups_total
            .with_label_values(&[result])
            .inc();
    }

    /// Record a request refused by the rate limiter.
    pub fn record_rate_limited(&self, route: &str) {
        self.rate_limited_total.with_label_values(&[route]).inc();
    }
}

/// Run `f` against the global metrics, if they registered.
pub fn with_metrics(f: impl FnOnce(&HelioMetrics)) {
    if let Ok(metrics) = METRICS.as_ref() {
        f(metrics);
    }
}

/// Handler for GET /metrics endpoint.
///
/// Returns Prometheus text format metrics.
pub async fn metrics_handler() -> impl IntoResponse {
    // Touch the registry so an idle process still exposes its metric families.
    Lazy::force(&METRICS);

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
