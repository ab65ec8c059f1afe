//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the axum router; every path falls through to the dispatcher
//! - Wire up middleware (request ID, tracing, timeout)
//! - Run the active health monitor alongside the listener
//! - Serve until shutdown is signalled

use std::sync::Arc;
use std::time::Duration;

use axum::{body::Body, extract::State, http::Request, response::{IntoResponse, Response}, Router};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::{HealthCheckConfig, TimeoutConfig};
use crate::dispatch::ProxyDispatcher;
use crate::health::HealthMonitor;
use crate::http::request::X_REQUEST_ID;
use crate::lifecycle::{Gateway, Shutdown};
use crate::registry::ServiceClientRegistry;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<ProxyDispatcher>,
}

/// HTTP server for the gateway.
pub struct HttpServer {
    router: Router,
    registry: Arc<ServiceClientRegistry>,
    health_config: HealthCheckConfig,
}

impl HttpServer {
    pub fn new(gateway: &Gateway) -> Self {
        let state = AppState {
            dispatcher: gateway.dispatcher().clone(),
        };
        Self {
            router: Self::build_router(&gateway.config().timeouts, state),
            registry: gateway.registry().clone(),
            health_config: gateway.config().health_check.clone(),
        }
    }

    #[allow(deprecated)]
    fn build_router(timeouts: &TimeoutConfig, state: AppState) -> Router {
        Router::new().fallback(proxy_handler).with_state(state).layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(X_REQUEST_ID, MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::new(X_REQUEST_ID))
                .layer(TimeoutLayer::new(Duration::from_secs(timeouts.request_secs))),
        )
    }

    /// The router, for serving on a custom listener or driving in tests.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Serve on `listener` until `shutdown` triggers.
    pub async fn run(self, listener: TcpListener, shutdown: &Shutdown) -> std::io::Result<()> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let monitor = HealthMonitor::new(self.registry.clone(), self.health_config.clone());
        let monitor_shutdown = shutdown.subscribe();
        let monitor_task = tokio::spawn(monitor.run(monitor_shutdown));

        let mut server_shutdown = shutdown.subscribe();
        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = server_shutdown.recv().await;
            })
            .await?;

        let _ = monitor_task.await;
        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Every inbound request goes through the dispatcher.
async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    match state.dispatcher.handle(request).await {
        Ok(response) => response,
        Err(e) => e.into_response(),
    }
}
