//! Reverse-proxy gateway with lazily constructed per-service clients.
//!
//! Each backend service's client context (server pool plus auxiliary beans)
//! is built by a registered factory the first time a request routes to it,
//! or at startup when the service is configured eager.

pub mod admin;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod health;
pub mod http;
pub mod lifecycle;
pub mod load_balancer;
pub mod observability;
pub mod registry;
pub mod resilience;
pub mod routing;

pub use config::GatewayConfig;
pub use error::GatewayError;
pub use http::HttpServer;
pub use lifecycle::{Gateway, Shutdown};
pub use registry::ServiceClientRegistry;
