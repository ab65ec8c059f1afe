//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check referential integrity (routes and eager clients reference declared services)
//! - Validate value ranges (timeouts > 0, addresses parse)
//! - Detect duplicate identifiers
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::GatewayConfig;
use crate::routing::matcher::PathPattern;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("duplicate route id '{0}'")]
    DuplicateRoute(String),

    #[error("duplicate service id '{0}'")]
    DuplicateService(String),

    #[error("route '{route_id}' has an invalid path pattern: {reason}")]
    InvalidPattern { route_id: String, reason: String },

    #[error("route '{route_id}' references undeclared service '{service_id}'")]
    UnknownService { route_id: String, service_id: String },

    #[error("eager_load.clients references undeclared service '{0}'")]
    UnknownEagerClient(String),

    #[error(
        "route '{route_id}' disables eager loading for service '{service_id}' \
         listed in eager_load.clients"
    )]
    ConflictingEagerLoad { route_id: String, service_id: String },

    #[error("service '{service_id}' has invalid server address '{address}'")]
    InvalidServer { service_id: String, address: String },

    #[error("service '{0}' must allow at least one connection per server")]
    ZeroConnections(String),

    #[error("{field} is not a valid socket address: '{value}'")]
    InvalidAddress { field: &'static str, value: String },

    #[error("{0} must be greater than zero")]
    Zero(&'static str),
}

/// Validate a parsed configuration.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_address(&mut errors, "listener.bind_address", &config.listener.bind_address);
    if config.admin.enabled {
        check_address(&mut errors, "admin.bind_address", &config.admin.bind_address);
    }
    if config.observability.metrics_enabled {
        check_address(
            &mut errors,
            "observability.metrics_address",
            &config.observability.metrics_address,
        );
    }

    let mut services = HashSet::new();
    for service in &config.services {
        if !services.insert(service.id.as_str()) {
            errors.push(ValidationError::DuplicateService(service.id.clone()));
        }
        if service.max_connections == 0 {
            errors.push(ValidationError::ZeroConnections(service.id.clone()));
        }
        for address in &service.servers {
            if address.parse::<SocketAddr>().is_err() {
                errors.push(ValidationError::InvalidServer {
                    service_id: service.id.clone(),
                    address: address.clone(),
                });
            }
        }
    }

    let mut route_ids = HashSet::new();
    for route in &config.routes {
        if !route_ids.insert(route.id.as_str()) {
            errors.push(ValidationError::DuplicateRoute(route.id.clone()));
        }
        if let Err(e) = PathPattern::parse(&route.path) {
            errors.push(ValidationError::InvalidPattern {
                route_id: route.id.clone(),
                reason: e.to_string(),
            });
        }
        if !services.contains(route.service_id.as_str()) {
            errors.push(ValidationError::UnknownService {
                route_id: route.id.clone(),
                service_id: route.service_id.clone(),
            });
        }
        if route.eager_load == Some(false)
            && config.eager_load.clients.contains(&route.service_id)
        {
            errors.push(ValidationError::ConflictingEagerLoad {
                route_id: route.id.clone(),
                service_id: route.service_id.clone(),
            });
        }
    }

    for client in &config.eager_load.clients {
        if !services.contains(client.as_str()) {
            errors.push(ValidationError::UnknownEagerClient(client.clone()));
        }
    }

    let timeouts = &config.timeouts;
    for (field, value) in [
        ("timeouts.connect_secs", timeouts.connect_secs),
        ("timeouts.upstream_secs", timeouts.upstream_secs),
        ("timeouts.request_secs", timeouts.request_secs),
    ] {
        if value == 0 {
            errors.push(ValidationError::Zero(field));
        }
    }
    if config.retries.max_attempts == 0 {
        errors.push(ValidationError::Zero("retries.max_attempts"));
    }
    if config.health_check.enabled && config.health_check.interval_secs == 0 {
        errors.push(ValidationError::Zero("health_check.interval_secs"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_address(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field,
            value: value.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::{RouteConfig, ServiceConfig};

    fn base() -> GatewayConfig {
        let mut config = GatewayConfig::default();
        config
            .services
            .push(ServiceConfig::new("lazy", vec!["127.0.0.1:3000".into()]));
        config.routes.push(RouteConfig::new("lazyroute", "lazy", "/lazy/**"));
        config
    }

    #[test]
    fn accepts_valid_config() {
        assert_eq!(validate_config(&base()), Ok(()));
    }

    #[test]
    fn collects_every_error() {
        let mut config = base();
        config.routes.push(RouteConfig::new("lazyroute", "ghost", "no-slash"));
        config.services.push(ServiceConfig::new("bad", vec!["not-an-address".into()]));
        config.eager_load.clients.push("phantom".into());
        config.timeouts.request_secs = 0;

        let errors = validate_config(&config).unwrap_err();
        assert!(errors.contains(&ValidationError::DuplicateRoute("lazyroute".into())));
        assert!(errors.contains(&ValidationError::UnknownService {
            route_id: "lazyroute".into(),
            service_id: "ghost".into(),
        }));
        assert!(errors.contains(&ValidationError::InvalidServer {
            service_id: "bad".into(),
            address: "not-an-address".into(),
        }));
        assert!(errors.contains(&ValidationError::UnknownEagerClient("phantom".into())));
        assert!(errors.contains(&ValidationError::Zero("timeouts.request_secs")));
        assert!(errors
            .iter()
            .any(|e| matches!(e, ValidationError::InvalidPattern { .. })));
    }

    #[test]
    fn route_cannot_opt_out_of_listed_eager_client() {
        let mut config = base();
        config.eager_load.clients.push("lazy".into());
        config.routes[0].eager_load = Some(false);

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![ValidationError::ConflictingEagerLoad {
                route_id: "lazyroute".into(),
                service_id: "lazy".into(),
            }]
        );
    }
}
