//! Diagnostics listener.
//!
//! Read-only JSON views of the gateway: overall status, per-service client
//! state, and the compiled route table.

pub mod handlers;

use std::sync::Arc;
use std::time::Instant;

use axum::{routing::get, Router};

use crate::lifecycle::Gateway;
use crate::registry::ServiceClientRegistry;
use crate::routing::RouteTable;

use self::handlers::{get_clients, get_routes, get_status};

#[derive(Clone)]
pub struct AdminState {
    pub registry: Arc<ServiceClientRegistry>,
    pub routes: Arc<RouteTable>,
    pub started_at: Instant,
}

impl AdminState {
    pub fn new(gateway: &Gateway) -> Self {
        Self {
            registry: gateway.registry().clone(),
            routes: gateway.routes().clone(),
            started_at: gateway.started_at(),
        }
    }
}

pub fn setup_admin_router(state: AdminState) -> Router {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/clients", get(get_clients))
        .route("/admin/routes", get(get_routes))
        .with_state(state)
}
