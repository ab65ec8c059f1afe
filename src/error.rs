//! Gateway error taxonomy.
//!
//! # Design Decisions
//! - One enum per failure domain; `GatewayError` is what a request handler sees
//! - Construction errors are `Clone` so a single failed attempt can be handed
//!   to every caller that was waiting on it
//! - HTTP status mapping lives here; rendering lives in `http::response`

use std::net::SocketAddr;
use std::time::Duration;

use axum::http::StatusCode;
use thiserror::Error;

/// Boxed error accepted from user-supplied factories and suppliers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Failure to produce a client context for a service.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientConstructionError {
    #[error("no client configuration registered for service '{service_id}'")]
    UnknownService { service_id: String },

    #[error("client factory for service '{service_id}' failed: {message}")]
    Factory { service_id: String, message: String },

    #[error("client factory for service '{service_id}' panicked")]
    Panicked { service_id: String },

    #[error("client construction for service '{service_id}' was abandoned")]
    Abandoned { service_id: String },
}

impl ClientConstructionError {
    /// The service whose construction failed.
    pub fn service_id(&self) -> &str {
        match self {
            Self::UnknownService { service_id }
            | Self::Factory { service_id, .. }
            | Self::Panicked { service_id }
            | Self::Abandoned { service_id } => service_id,
        }
    }
}

/// Failure while forwarding a request to a backend server.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("upstream {backend} timed out after {timeout:?}")]
    Timeout { backend: SocketAddr, timeout: Duration },

    #[error("upstream {backend} request failed: {source}")]
    Upstream {
        backend: SocketAddr,
        #[source]
        source: BoxError,
    },

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

/// No route pattern matched the inbound path.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("no route matches path '{path}'")]
pub struct RouteNotFound {
    pub path: String,
}

/// Everything a proxied request can fail with.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error(transparent)]
    RouteNotFound(#[from] RouteNotFound),

    #[error(transparent)]
    ClientConstruction(#[from] ClientConstructionError),

    #[error("no available backend for service '{service_id}'")]
    BackendUnavailable { service_id: String },

    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl GatewayError {
    /// HTTP status reported to the caller.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::RouteNotFound(_) => StatusCode::NOT_FOUND,
            Self::ClientConstruction(_) | Self::BackendUnavailable { .. } => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            Self::Transport(TransportError::Timeout { .. }) => StatusCode::GATEWAY_TIMEOUT,
            Self::Transport(TransportError::InvalidRequest(_)) => StatusCode::BAD_REQUEST,
            Self::Transport(TransportError::Upstream { .. }) => StatusCode::BAD_GATEWAY,
        }
    }

    /// Short client-visible message; details stay in the logs.
    pub fn public_message(&self) -> &'static str {
        match self {
            Self::RouteNotFound(_) => "No matching route found",
            Self::ClientConstruction(_) => "Backend client unavailable",
            Self::BackendUnavailable { .. } => "No available backends",
            Self::Transport(TransportError::Timeout { .. }) => "Upstream request timed out",
            Self::Transport(TransportError::InvalidRequest(_)) => "Invalid request",
            Self::Transport(TransportError::Upstream { .. }) => "Upstream request failed",
        }
    }
}
