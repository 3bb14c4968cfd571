//! Metrics collection and exposition.
//!
//! # Metrics
//! - `service_lens_requests_total` (counter): requests by app, route, status
//! - `service_lens_request_duration_seconds` (histogram): latency by app, route
//! - `service_lens_flakes_total` (counter): injected failures by app, code
//! - `service_lens_upstream_errors_total` (counter): failed upstream calls by app, kind
//!
//! Recording is a no-op until [`init_metrics`] installs the Prometheus recorder.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

pub const METRIC_REQUESTS_TOTAL: &str = "service_lens_requests_total";
pub const METRIC_REQUEST_DURATION: &str = "service_lens_request_duration_seconds";
pub const METRIC_FLAKES_TOTAL: &str = "service_lens_flakes_total";
pub const METRIC_UPSTREAM_ERRORS_TOTAL: &str = "service_lens_upstream_errors_total";

/// Install the Prometheus recorder with a scrape listener on `addr`.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => {
            describe_counter!(METRIC_REQUESTS_TOTAL, "Total requests served");
            describe_histogram!(
                METRIC_REQUEST_DURATION,
                metrics::Unit::Seconds,
                "Request latency"
            );
            describe_counter!(METRIC_FLAKES_TOTAL, "Injected flaky responses");
            describe_counter!(METRIC_UPSTREAM_ERRORS_TOTAL, "Failed upstream calls");
            tracing::info!(address = %addr, "Metrics endpoint listening");
        }
        Err(e) => {
            tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter");
        }
    }
}

/// Record a completed request.
pub fn record_request(app: &str, route: &str, status: u16, start: Instant) {
    counter!(
        METRIC_REQUESTS_TOTAL,
        "app" => app.to_string(),
        "route" => route.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!(
        METRIC_REQUEST_DURATION,
        "app" => app.to_string(),
        "route" => route.to_string()
    )
    .record(start.elapsed().as_secs_f64());
}

/// Record an injected failure.
pub fn record_flake(app: &str, code: u16) {
    counter!(METRIC_FLAKES_TOTAL, "app" => app.to_string(), "code" => code.to_string()).increment(1);
}

/// Record a failed upstream call.
pub fn record_upstream_error(app: &str, kind: &'static str) {
    counter!(METRIC_UPSTREAM_ERRORS_TOTAL, "app" => app.to_string(), "kind" => kind).increment(1);
}
