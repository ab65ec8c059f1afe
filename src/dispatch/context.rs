//! Per-request scratch state.
//!
//! A [`RequestContext`] is created when a request enters the dispatcher and
//! dropped when it leaves, on every exit path. It is owned by exactly one
//! request flow and never shared, so attributes set by one request are
//! invisible to every other.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::routing::Route;

/// Request-scoped attributes plus the dispatch decisions made so far.
pub struct RequestContext {
    request_id: String,
    route: Option<Arc<Route>>,
    chosen_server: Option<SocketAddr>,
    attributes: HashMap<String, Box<dyn Any + Send>>,
    started: Instant,
}

impl RequestContext {
    pub fn new(request_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            route: None,
            chosen_server: None,
            attributes: HashMap::new(),
            started: Instant::now(),
        }
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn route(&self) -> Option<&Arc<Route>> {
        self.route.as_ref()
    }

    pub fn set_route(&mut self, route: Arc<Route>) {
        self.route = Some(route);
    }

    pub fn chosen_server(&self) -> Option<SocketAddr> {
        self.chosen_server
    }

    pub fn set_chosen_server(&mut self, server: SocketAddr) {
        self.chosen_server = Some(server);
    }

    /// Typed attribute lookup; `None` if absent or of another type.
    pub fn get<T: Any>(&self, name: &str) -> Option<&T> {
        self.attributes.get(name).and_then(|v| v.downcast_ref::<T>())
    }

    /// Store an attribute, replacing any previous value under `name`.
    pub fn set<T: Any + Send>(&mut self, name: impl Into<String>, value: T) {
        self.attributes.insert(name.into(), Box::new(value));
    }

    pub fn remove<T: Any>(&mut self, name: &str) -> Option<T> {
        let value = self.attributes.remove(name)?;
        match value.downcast::<T>() {
            Ok(v) => Some(*v),
            Err(original) => {
                self.attributes.insert(name.to_string(), original);
                None
            }
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

impl fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestContext")
            .field("request_id", &self.request_id)
            .field("route", &self.route.as_ref().map(|r| r.id()))
            .field("chosen_server", &self.chosen_server)
            .field("attributes", &self.attributes.len())
            .finish()
    }
}

impl Drop for RequestContext {
    fn drop(&mut self) {
        let attributes = self.attributes.len();
        self.attributes.clear();
        self.route = None;
        tracing::trace!(
            request_id = %self.request_id,
            attributes,
            elapsed_ms = self.started.elapsed().as_millis() as u64,
            "Request context released"
        );
    }
}
