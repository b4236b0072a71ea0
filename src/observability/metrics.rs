//! Metrics collection and exposition.
//!
//! # Metrics
//! - `font_proxy_requests_total` (counter): requests by status and outcome
//! - `font_proxy_request_duration_seconds` (histogram): end-to-end latency by outcome
//! - `font_proxy_cache_lookups_total` (counter): lookups by result (hit/miss)
//! - `font_proxy_upstream_requests_total` (counter): upstream responses by status
//! - `font_proxy_upstream_duration_seconds` (histogram): upstream latency
//! - `font_proxy_upstream_errors_total` (counter): network-level upstream failures

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Instant;

/// Install the Prometheus recorder and its HTTP listener.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => {
            tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter")
        }
    }
}

/// Record a completed inbound request.
///
/// `outcome` is `hit`, `miss`, `passthrough` or `rejected`.
pub fn record_request(status: u16, outcome: &'static str, start: Instant) {
    ::metrics::counter!(
        "font_proxy_requests_total",
        "status" => status.to_string(),
        "outcome" => outcome
    )
    .increment(1);
    ::metrics::histogram!("font_proxy_request_duration_seconds", "outcome" => outcome)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_cache_lookup(hit: bool) {
    let result = if hit { "hit" } else { "miss" };
    ::metrics::counter!("font_proxy_cache_lookups_total", "result" => result).increment(1);
}

pub fn record_upstream_response(status: u16, start: Instant) {
    ::metrics::counter!("font_proxy_upstream_requests_total", "status" => status.to_string())
        .increment(1);
    ::metrics::histogram!("font_proxy_upstream_duration_seconds")
        .record(start.elapsed().as_secs_f64());
}

pub fn record_upstream_error() {
    ::metrics::counter!("font_proxy_upstream_errors_total").increment(1);
}
