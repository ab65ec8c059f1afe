//! Active health checking of loaded service clients.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::Request;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use tokio::sync::broadcast;
use tokio::time;

use crate::config::HealthCheckConfig;
use crate::observability::metrics;
use crate::registry::ServiceClientRegistry;

pub struct HealthMonitor {
    registry: Arc<ServiceClientRegistry>,
    config: HealthCheckConfig,
    client: Client<HttpConnector, Body>,
}

impl HealthMonitor {
    pub fn new(registry: Arc<ServiceClientRegistry>, config: HealthCheckConfig) -> Self {
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        Self {
            registry,
            config,
            client,
        }
    }

    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        if !self.config.enabled {
            tracing::info!("Active health checks disabled");
            return;
        }

        tracing::info!(
            interval = self.config.interval_secs,
            path = %self.config.path,
            "Health monitor starting"
        );

        let mut ticker = time::interval(Duration::from_secs(self.config.interval_secs));
        loop {
            tokio::select! {
                _ = ticker.tick() => self.check_all().await,
                _ = shutdown.recv() => {
                    tracing::info!("Health monitor received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    /// Probe every backend of every constructed client once.
    pub async fn check_all(&self) {
        for ctx in self.registry.loaded_contexts() {
            for backend in ctx.pool().backends() {
                let healthy = self.probe(backend.addr).await;
                if healthy {
                    backend.mark_success(self.config.healthy_threshold as usize);
                } else {
                    backend.mark_failure(self.config.unhealthy_threshold as usize);
                }
                metrics::record_backend_health(&backend.addr.to_string(), backend.is_healthy());
            }
        }
    }

    async fn probe(&self, addr: SocketAddr) -> bool {
        let request = match Request::builder()
            .method("GET")
            .uri(format!("http://{}{}", addr, self.config.path))
            .header("user-agent", "lazy-gateway-health-check")
            .body(Body::empty())
        {
            Ok(req) => req,
            Err(e) => {
                tracing::error!(addr = %addr, error = %e, "Failed to build health check request");
                return false;
            }
        };

        let timeout = Duration::from_secs(self.config.timeout_secs);
        match time::timeout(timeout, self.client.request(request)).await {
            Ok(Ok(response)) => {
                let success = response.status().is_success();
                if !success {
                    tracing::warn!(
                        addr = %addr,
                        status = %response.status(),
                        "Health check failed: non-success status"
                    );
                }
                success
            }
            Ok(Err(e)) => {
                tracing::warn!(addr = %addr, error = %e, "Health check failed: connection error");
                false
            }
            Err(_) => {
                tracing::warn!(addr = %addr, "Health check failed: timeout");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::HealthState;
    use crate::registry::{ClientContext, ServiceClientConfig, StaticServerList};
    use axum::{http::StatusCode, routing::get, Router};
    use tokio::net::TcpListener;

    async fn backend(status: StatusCode) -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = Router::new().route("/health", get(move || async move { status }));
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        addr
    }

    fn config() -> HealthCheckConfig {
        HealthCheckConfig {
            enabled: true,
            unhealthy_threshold: 1,
            healthy_threshold: 1,
            timeout_secs: 2,
            ..HealthCheckConfig::default()
        }
    }

    #[tokio::test]
    async fn probes_only_loaded_clients() {
        let ok = backend(StatusCode::OK).await;
        let failing = backend(StatusCode::INTERNAL_SERVER_ERROR).await;

        let mut registry = ServiceClientRegistry::new();
        registry
            .register_config(
                ServiceClientConfig::new("loaded", move || {
                    ClientContext::builder("loaded")
                        .server_list(StaticServerList::new([ok, failing]))
                        .build()
                }),
                true,
            )
            .unwrap();
        registry
            .register_config(
                ServiceClientConfig::new("lazy", || ClientContext::builder("lazy").build()),
                false,
            )
            .unwrap();
        let registry = Arc::new(registry);

        HealthMonitor::new(registry.clone(), config()).check_all().await;

        let ctx = registry.get_or_create("loaded").await.unwrap();
        let states: Vec<_> = ctx.pool().backends().iter().map(|b| b.health()).collect();
        assert_eq!(states, vec![HealthState::Healthy, HealthState::Unhealthy]);
        assert_eq!(registry.construction_count("lazy"), 0);
    }
}
