//! Startup orchestration.
//!
//! # Responsibilities
//! - Validate configuration
//! - Compile the route table
//! - Register one client factory per declared service
//! - Construct eager clients before any listener binds
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Services are declared in config; code may replace a declared service's
//!   factory (custom server lists, auxiliary beans) but not invent new ids

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;

use crate::config::{validate_config, ConfigError, GatewayConfig};
use crate::dispatch::{HttpTransport, ProxyDispatcher, Transport};
use crate::error::BoxError;
use crate::registry::{
    ClientContext, RegistrationError, ServiceClientConfig, ServiceClientRegistry,
};
use crate::routing::{PatternError, RouteTable};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("invalid route pattern: {0}")]
    Route(#[from] PatternError),

    #[error("client factory supplied for undeclared service '{0}'")]
    UndeclaredService(String),

    #[error(transparent)]
    Registration(#[from] RegistrationError),
}

/// Services whose clients are constructed at startup.
///
/// A service is eager when `eager_load.enabled` is set, when it is listed in
/// `eager_load.clients`, or when any route targeting it sets `eager_load = true`.
pub fn eager_services(config: &GatewayConfig) -> BTreeSet<String> {
    config
        .services
        .iter()
        .filter(|service| {
            config.eager_load.enabled
                || config.eager_load.clients.contains(&service.id)
                || config
                    .routes
                    .iter()
                    .any(|r| r.service_id == service.id && r.eager_load == Some(true))
        })
        .map(|service| service.id.clone())
        .collect()
}

/// Assembles a [`Gateway`] from config plus code-supplied factories.
pub struct GatewayBuilder {
    config: GatewayConfig,
    factories: HashMap<String, ServiceClientConfig>,
    transport: Option<Arc<dyn Transport>>,
}

impl GatewayBuilder {
    pub fn new(config: GatewayConfig) -> Self {
        Self {
            config,
            factories: HashMap::new(),
            transport: None,
        }
    }

    /// Replace the config-derived factory of a declared service.
    pub fn client_factory<F>(mut self, service_id: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> Result<ClientContext, BoxError> + Send + Sync + 'static,
    {
        let config = ServiceClientConfig::new(service_id, factory);
        self.factories.insert(config.service_id().to_string(), config);
        self
    }

    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn build(mut self) -> Result<Gateway, StartupError> {
        let config = self.config;
        validate_config(&config).map_err(ConfigError::Validation)?;

        if let Some(id) = self
            .factories
            .keys()
            .find(|id| !config.services.iter().any(|s| &s.id == *id))
        {
            return Err(StartupError::UndeclaredService(id.clone()));
        }

        let routes = Arc::new(RouteTable::from_config(&config.routes)?);

        let eager = eager_services(&config);
        let mut registry = ServiceClientRegistry::new();
        for service in &config.services {
            let client_config = self
                .factories
                .remove(&service.id)
                .unwrap_or_else(|| ServiceClientConfig::from_service(service));
            registry.register_config(client_config, eager.contains(&service.id))?;
        }
        let registry = Arc::new(registry);

        let transport = self
            .transport
            .unwrap_or_else(|| Arc::new(HttpTransport::new(&config.timeouts)));
        let dispatcher = Arc::new(
            ProxyDispatcher::new(routes.clone(), registry.clone(), transport)
                .with_retry(config.retries.clone())
                .with_health(config.health_check.clone()),
        );

        tracing::info!(
            routes = routes.len(),
            services = config.services.len(),
            eager = eager.len(),
            "Gateway initialized"
        );

        Ok(Gateway {
            config,
            routes,
            registry,
            dispatcher,
            started_at: Instant::now(),
        })
    }
}

/// A fully initialized gateway, ready to be served.
pub struct Gateway {
    config: GatewayConfig,
    routes: Arc<RouteTable>,
    registry: Arc<ServiceClientRegistry>,
    dispatcher: Arc<ProxyDispatcher>,
    started_at: Instant,
}

impl Gateway {
    pub fn builder(config: GatewayConfig) -> GatewayBuilder {
        GatewayBuilder::new(config)
    }

    pub fn from_config(config: GatewayConfig) -> Result<Self, StartupError> {
        Self::builder(config).build()
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn routes(&self) -> &Arc<RouteTable> {
        &self.routes
    }

    pub fn registry(&self) -> &Arc<ServiceClientRegistry> {
        &self.registry
    }

    pub fn dispatcher(&self) -> &Arc<ProxyDispatcher> {
        &self.dispatcher
    }

    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }

    pub fn started_at(&self) -> Instant {
        self.started_at
    }
}
