//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): requests by route, status
//! - `gateway_request_duration_seconds` (histogram): latency by route
//! - `gateway_client_constructions_total` (counter): factory runs by service, outcome
//! - `gateway_client_construction_seconds` (histogram): factory latency by service
//! - `gateway_backend_health` (gauge): 1=healthy, 0=unhealthy
//! - `gateway_retries_total` (counter): retried attempts by route

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_request(route: &str, status: u16, start: Instant) {
    metrics::counter!(
        "gateway_requests_total",
        "route" => route.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!("gateway_request_duration_seconds", "route" => route.to_string())
        .record(start.elapsed().as_secs_f64());
}

pub fn record_client_construction(service_id: &str, outcome: &'static str, elapsed: Duration) {
    metrics::counter!(
        "gateway_client_constructions_total",
        "service_id" => service_id.to_string(),
        "outcome" => outcome
    )
    .increment(1);
    metrics::histogram!(
        "gateway_client_construction_seconds",
        "service_id" => service_id.to_string()
    )
    .record(elapsed.as_secs_f64());
}

pub fn record_backend_health(backend: &str, healthy: bool) {
    metrics::gauge!("gateway_backend_health", "backend" => backend.to_string())
        .set(if healthy { 1.0 } else { 0.0 });
}

pub fn record_retry(route: &str) {
    metrics::counter!("gateway_retries_total", "route" => route.to_string()).increment(1);
}
