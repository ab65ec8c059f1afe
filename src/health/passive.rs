//! Passive health checking.
//!
//! - Connection errors, timeouts and 502/503/504 count as failures
//! - Everything else, 4xx included, counts as a success

use axum::http::StatusCode;

use crate::config::HealthCheckConfig;
use crate::load_balancer::Backend;
use crate::observability::metrics;

/// Whether an upstream response blames the backend.
pub fn is_backend_failure(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE | StatusCode::GATEWAY_TIMEOUT
    )
}

/// Feed one request outcome into the backend's health counters.
///
/// `status` is `None` when no response arrived.
pub fn observe(backend: &Backend, status: Option<StatusCode>, config: &HealthCheckConfig) {
    let failed = status.map_or(true, is_backend_failure);
    let transitioned = if failed {
        backend.mark_failure(config.unhealthy_threshold as usize)
    } else {
        backend.mark_success(config.healthy_threshold as usize)
    };
    if transitioned {
        metrics::record_backend_health(&backend.addr.to_string(), backend.is_healthy());
    }
}
