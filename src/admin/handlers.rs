use axum::{extract::State, Json};
use serde::Serialize;

use crate::admin::AdminState;
use crate::registry::{ClientStatus, EntryState};

#[derive(Debug, Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub uptime_secs: u64,
    pub routes: usize,
    pub services: usize,
    pub loaded_clients: usize,
}

#[derive(Debug, Serialize)]
pub struct RouteSummary {
    pub id: String,
    pub service_id: String,
    pub pattern: String,
    pub eager_load: Option<bool>,
    pub strip_prefix: bool,
    pub retryable: bool,
}

pub async fn get_status(State(state): State<AdminState>) -> Json<SystemStatus> {
    let clients = state.registry.snapshot();
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
        uptime_secs: state.started_at.elapsed().as_secs(),
        routes: state.routes.len(),
        services: clients.len(),
        loaded_clients: clients
            .iter()
            .filter(|c| c.state == EntryState::Loaded)
            .count(),
    })
}

pub async fn get_clients(State(state): State<AdminState>) -> Json<Vec<ClientStatus>> {
    Json(state.registry.snapshot())
}

/// Routes in match order.
pub async fn get_routes(State(state): State<AdminState>) -> Json<Vec<RouteSummary>> {
    Json(
        state
            .routes
            .routes()
            .iter()
            .map(|r| RouteSummary {
                id: r.id().to_string(),
                service_id: r.service_id().to_string(),
                pattern: r.pattern().to_string(),
                eager_load: r.eager_load(),
                strip_prefix: r.strip_prefix(),
                retryable: r.retryable(),
            })
            .collect(),
    )
}
