//! Load balancing subsystem.
//!
//! # Data Flow
//! ```text
//! Client context loaded for a service
//!     → pool.rs (the service's backends)
//!     → Apply load balancing algorithm:
//!         - round_robin.rs (rotate through backends)
//!         - least_conn.rs (pick backend with fewest connections)
//!         - random.rs (uniform pick)
//!     → backend.rs (reserve a connection slot)
//!     → Return connection guard or nothing
//! ```
//!
//! # Design Decisions
//! - One pool per service, owned by that service's client context
//! - Algorithm selection per service
//! - Unhealthy backends excluded from selection

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

pub mod backend;
pub mod least_conn;
pub mod pool;
pub mod random;
pub mod round_robin;

pub use backend::{Backend, BackendConnectionGuard};
pub use pool::ServerPool;

/// Chooses the next backend from a pool.
pub trait LoadBalancer: Send + Sync + fmt::Debug {
    /// Returns a healthy backend, or `None` if there is none.
    fn next_server(&self, backends: &[Arc<Backend>]) -> Option<Arc<Backend>>;
}

/// Configurable balancing policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadBalancerPolicy {
    #[default]
    RoundRobin,
    LeastConnections,
    Random,
}

impl LoadBalancerPolicy {
    pub fn build(self) -> Box<dyn LoadBalancer> {
        match self {
            LoadBalancerPolicy::RoundRobin => Box::new(round_robin::RoundRobin::new()),
            LoadBalancerPolicy::LeastConnections => Box::new(least_conn::LeastConnections::new()),
            LoadBalancerPolicy::Random => Box::new(random::Random::new()),
        }
    }
}
