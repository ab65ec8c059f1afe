//! Route lookup.
//!
//! # Responsibilities
//! - Store compiled routes in match order
//! - Resolve a request path to its route
//! - Compute the path forwarded upstream
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - Routes sorted once: exact patterns, then longer literal prefix, then
//!   registration order (stable sort)
//! - O(n) scan, first match wins; acceptable for typical route counts
//! - Explicit `RouteNotFound` rather than silent default

use std::sync::Arc;

use crate::config::RouteConfig;
use crate::error::RouteNotFound;
use crate::routing::matcher::{PathPattern, PatternError};

/// A compiled route.
#[derive(Debug, Clone)]
pub struct Route {
    id: String,
    service_id: String,
    pattern: PathPattern,
    eager_load: Option<bool>,
    strip_prefix: bool,
    retryable: bool,
}

impl Route {
    /// Create a route with default flags (strip prefix on, retries off).
    pub fn new(
        id: impl Into<String>,
        service_id: impl Into<String>,
        pattern: &str,
    ) -> Result<Self, PatternError> {
        Ok(Self {
            id: id.into(),
            service_id: service_id.into(),
            pattern: PathPattern::parse(pattern)?,
            eager_load: None,
            strip_prefix: true,
            retryable: false,
        })
    }

    /// Compile a configured route.
    pub fn from_config(config: &RouteConfig) -> Result<Self, PatternError> {
        Ok(Self::new(&config.id, &config.service_id, &config.path)?
            .with_eager_load(config.eager_load)
            .with_strip_prefix(config.strip_prefix)
            .with_retryable(config.retryable))
    }

    pub fn with_eager_load(mut self, eager_load: Option<bool>) -> Self {
        self.eager_load = eager_load;
        self
    }

    pub fn with_strip_prefix(mut self, strip_prefix: bool) -> Self {
        self.strip_prefix = strip_prefix;
        self
    }

    pub fn with_retryable(mut self, retryable: bool) -> Self {
        self.retryable = retryable;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn service_id(&self) -> &str {
        &self.service_id
    }

    pub fn pattern(&self) -> &PathPattern {
        &self.pattern
    }

    /// Per-route eager flag; `None` defers to the global default.
    pub fn eager_load(&self) -> Option<bool> {
        self.eager_load
    }

    pub fn strip_prefix(&self) -> bool {
        self.strip_prefix
    }

    pub fn retryable(&self) -> bool {
        self.retryable
    }

    /// Path sent upstream for a matched request path.
    ///
    /// With `strip_prefix`, the pattern's literal prefix is removed from wildcard
    /// routes: `/lazy/**` forwards `/lazy/sample` as `/sample`. Exact routes
    /// forward unchanged.
    pub fn forward_path(&self, path: &str) -> String {
        if !self.strip_prefix || self.pattern.is_exact() {
            return path.to_string();
        }
        let prefix = self.pattern.literal_prefix();
        match path.strip_prefix(prefix) {
            Some(rest) if rest.is_empty() => "/".to_string(),
            Some(rest) if rest.starts_with('/') => rest.to_string(),
            _ => path.to_string(),
        }
    }
}

/// Immutable path → route table.
#[derive(Debug, Default)]
pub struct RouteTable {
    routes: Vec<Arc<Route>>,
}

impl RouteTable {
    /// Build a table; `routes` is in registration order.
    pub fn new(routes: Vec<Route>) -> Self {
        let mut routes: Vec<Arc<Route>> = routes.into_iter().map(Arc::new).collect();
        // Stable: equal specificity keeps registration order.
        routes.sort_by(|a, b| b.pattern.specificity().cmp(&a.pattern.specificity()));
        Self { routes }
    }

    /// Compile configured routes.
    pub fn from_config(configs: &[RouteConfig]) -> Result<Self, PatternError> {
        let routes = configs
            .iter()
            .map(Route::from_config)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(routes))
    }

    /// Resolve a request path to the most specific matching route.
    pub fn resolve(&self, path: &str) -> Result<&Arc<Route>, RouteNotFound> {
        self.routes
            .iter()
            .find(|r| r.pattern.matches(path))
            .ok_or_else(|| RouteNotFound {
                path: path.to_string(),
            })
    }

    /// Routes in match order.
    pub fn routes(&self) -> &[Arc<Route>] {
        &self.routes
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
