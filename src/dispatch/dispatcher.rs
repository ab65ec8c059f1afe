//! Request dispatch: route → client context → server → transport.

use std::sync::Arc;
use std::time::Instant;

use axum::body::Body;
use axum::http::request::Parts;
use axum::http::{HeaderValue, Request, Response, Uri};

use crate::config::{HealthCheckConfig, RetryConfig};
use crate::dispatch::context::RequestContext;
use crate::dispatch::transport::Transport;
use crate::error::{GatewayError, TransportError};
use crate::health::passive;
use crate::http::request::{self as headers, X_FORWARDED_PREFIX, X_REQUEST_ID};
use crate::observability::metrics;
use crate::registry::ServiceClientRegistry;
use crate::resilience::{calculate_backoff, is_retryable, RetryBudget};
use crate::routing::{Route, RouteTable};

/// Largest body buffered so a retryable request can be replayed.
pub const MAX_REPLAY_BODY: usize = 1024 * 1024;

/// Request attribute holding the number of upstream attempts made (`u32`).
pub const ATTEMPTS: &str = "attempts";

/// Forwards inbound requests to the backend of their matched route.
pub struct ProxyDispatcher {
    routes: Arc<RouteTable>,
    registry: Arc<ServiceClientRegistry>,
    transport: Arc<dyn Transport>,
    retry: RetryConfig,
    retry_budget: RetryBudget,
    health: HealthCheckConfig,
}

impl ProxyDispatcher {
    pub fn new(
        routes: Arc<RouteTable>,
        registry: Arc<ServiceClientRegistry>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        let retry = RetryConfig::default();
        Self {
            routes,
            registry,
            transport,
            retry_budget: RetryBudget::new(retry.budget_ratio, retry.min_retries),
            retry,
            health: HealthCheckConfig::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry_budget = RetryBudget::new(retry.budget_ratio, retry.min_retries);
        self.retry = retry;
        self
    }

    pub fn with_health(mut self, health: HealthCheckConfig) -> Self {
        self.health = health;
        self
    }

    pub fn routes(&self) -> &Arc<RouteTable> {
        &self.routes
    }

    pub fn registry(&self) -> &Arc<ServiceClientRegistry> {
        &self.registry
    }

    /// Handle one inbound request end to end.
    pub async fn handle(&self, request: Request<Body>) -> Result<Response<Body>, GatewayError> {
        let start = Instant::now();
        let request_id = headers::request_id(request.headers())
            .map(str::to_string)
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        let method = request.method().clone();
        let path = request.uri().path().to_string();

        let mut ctx = RequestContext::new(request_id);
        tracing::debug!(
            request_id = %ctx.request_id(),
            method = %method,
            path = %path,
            "Dispatching request"
        );

        let result = self.dispatch(&mut ctx, request).await;

        let route = ctx.route().map(|r| r.id().to_string());
        let route_label = route.as_deref().unwrap_or("none");
        let attempts = ctx.get::<u32>(ATTEMPTS).copied().unwrap_or(0);
        match &result {
            Ok(response) => {
                metrics::record_request(route_label, response.status().as_u16(), start);
                tracing::debug!(
                    request_id = %ctx.request_id(),
                    route = route_label,
                    status = %response.status(),
                    attempts,
                    elapsed_ms = ctx.elapsed().as_millis() as u64,
                    "Request completed"
                );
            }
            Err(e) => {
                metrics::record_request(route_label, e.status().as_u16(), start);
                tracing::warn!(
                    request_id = %ctx.request_id(),
                    route = route_label,
                    method = %method,
                    path = %path,
                    backend = ?ctx.chosen_server(),
                    attempts,
                    error = %e,
                    "Request failed"
                );
            }
        }
        result
    }

    async fn dispatch(
        &self,
        ctx: &mut RequestContext,
        request: Request<Body>,
    ) -> Result<Response<Body>, GatewayError> {
        let route = self.routes.resolve(request.uri().path())?.clone();
        ctx.set_route(route.clone());

        let client = self.registry.get_or_create(route.service_id()).await?;

        let (parts, body) = request.into_parts();
        let replayable =
            self.retry.enabled && route.retryable() && parts.method.is_idempotent();
        let (buffered, mut streaming) = if replayable {
            let bytes = axum::body::to_bytes(body, MAX_REPLAY_BODY)
                .await
                .map_err(|e| TransportError::InvalidRequest(e.to_string()))?;
            (Some(bytes), None)
        } else {
            (None, Some(body))
        };
        let max_attempts = if replayable { self.retry.max_attempts.max(1) } else { 1 };

        self.retry_budget.record_request();

        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            ctx.set(ATTEMPTS, attempt);

            let guard = client.pool().select().ok_or_else(|| {
                GatewayError::BackendUnavailable {
                    service_id: route.service_id().to_string(),
                }
            })?;
            let server = guard.addr;
            ctx.set_chosen_server(server);

            let body = match &buffered {
                Some(bytes) => Body::from(bytes.clone()),
                None => streaming.take().unwrap_or_else(Body::empty),
            };
            let upstream = upstream_request(&parts, &route, ctx.request_id(), body)?;

            let outcome = self.transport.forward(server, upstream).await;
            let status = outcome.as_ref().ok().map(|r| r.status());
            // A request we could not build says nothing about the backend.
            let backend_fault = matches!(
                outcome,
                Err(TransportError::Upstream { .. } | TransportError::Timeout { .. })
            );
            if status.is_some() || backend_fault {
                passive::observe(guard.backend(), status, &self.health);
            }

            if attempt < max_attempts
                && is_retryable(&parts.method, status, backend_fault)
                && self.retry_budget.can_retry()
            {
                let delay =
                    calculate_backoff(attempt, self.retry.base_delay_ms, self.retry.max_delay_ms);
                tracing::info!(
                    request_id = %ctx.request_id(),
                    route = %route.id(),
                    backend = %server,
                    attempt,
                    delay = ?delay,
                    status = ?status,
                    "Retrying request"
                );
                metrics::record_retry(route.id());
                drop(guard);
                tokio::time::sleep(delay).await;
                continue;
            }

            return outcome.map_err(GatewayError::from);
        }
    }
}

/// Build the request for one upstream attempt.
fn upstream_request(
    parts: &Parts,
    route: &Route,
    request_id: &str,
    body: Body,
) -> Result<Request<Body>, TransportError> {
    let path = parts.uri.path();
    let forward_path = route.forward_path(path);
    let path_and_query = match parts.uri.query() {
        Some(query) => format!("{}?{}", forward_path, query),
        None => forward_path.clone(),
    };
    let uri: Uri = path_and_query
        .parse()
        .map_err(|e: axum::http::uri::InvalidUri| TransportError::InvalidRequest(e.to_string()))?;

    let mut request = Request::new(body);
    *request.method_mut() = parts.method.clone();
    *request.uri_mut() = uri;
    *request.headers_mut() = headers::forwardable_headers(&parts.headers);

    let invalid =
        |e: axum::http::header::InvalidHeaderValue| TransportError::InvalidRequest(e.to_string());
    request
        .headers_mut()
        .insert(X_REQUEST_ID, HeaderValue::from_str(request_id).map_err(invalid)?);
    if forward_path != path {
        let prefix = route.pattern().literal_prefix();
        request
            .headers_mut()
            .insert(X_FORWARDED_PREFIX, HeaderValue::from_str(prefix).map_err(invalid)?);
    }
    Ok(request)
}
