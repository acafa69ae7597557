//! Metrics collection and exposition.
//!
//! # Metrics
//! - `sitetree_requests_total` (counter): requests by method, status
//! - `sitetree_request_duration_seconds` (histogram): latency by method
//! - `sitetree_reloads_total` (counter): reloads by result
//! - `sitetree_compile_errors` (gauge): error records of the active snapshot
//!
//! # Design Decisions
//! - The exporter is optional; without it the macros hit a no-op recorder
//! - Label values are bounded (methods, status codes, ok/error)

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Serve Prometheus metrics on `addr`. Needs a running tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(method: &str, status: u16, start: Instant) {
    let method = method.to_string();
    ::metrics::counter!(
        "sitetree_requests_total",
        "method" => method.clone(),
        "status" => status.to_string()
    )
    .increment(1);
    ::metrics::histogram!("sitetree_request_duration_seconds", "method" => method)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_reload(success: bool) {
    let result = if success { "ok" } else { "error" };
    ::metrics::counter!("sitetree_reloads_total", "result" => result).increment(1);
}

pub fn set_compile_errors(count: usize) {
    ::metrics::gauge!("sitetree_compile_errors").set(count as f64);
}
