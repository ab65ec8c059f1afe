//! Per-service server pool.
//!
//! # Responsibilities
//! - Hold the backends of one service
//! - Apply the service's load balancing policy
//! - Hand out connection guards for tracking
//!
//! # Design Decisions
//! - When every backend is ejected the pool still routes to one of them, so
//!   passive health sees the outcome and a recovered backend is re-admitted
//!   without active checks

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::load_balancer::{
    backend::{Backend, BackendConnectionGuard},
    LoadBalancer, LoadBalancerPolicy,
};

/// Backends of one service plus the policy choosing among them.
#[derive(Debug)]
pub struct ServerPool {
    backends: Vec<Arc<Backend>>,
    balancer: Box<dyn LoadBalancer>,
    policy: LoadBalancerPolicy,
    fallback: AtomicUsize,
}

impl ServerPool {
    /// Create a pool; duplicate addresses are collapsed.
    pub fn new(servers: &[SocketAddr], policy: LoadBalancerPolicy, max_connections: usize) -> Self {
        let mut backends: Vec<Arc<Backend>> = Vec::with_capacity(servers.len());
        for addr in servers {
            if backends.iter().any(|b| b.addr == *addr) {
                tracing::debug!(addr = %addr, "Duplicate server ignored");
                continue;
            }
            backends.push(Arc::new(Backend::new(*addr, max_connections)));
        }
        Self {
            backends,
            balancer: policy.build(),
            policy,
            fallback: AtomicUsize::new(0),
        }
    }

    /// Select a backend and reserve a connection slot on it.
    ///
    /// With every backend unhealthy, ejected backends are tried in rotation.
    /// `None` means the pool is empty or the chosen backend is at its
    /// connection limit.
    pub fn select(&self) -> Option<BackendConnectionGuard> {
        if let Some(backend) = self.balancer.next_server(&self.backends) {
            return backend.try_acquire();
        }
        if self.backends.is_empty() {
            return None;
        }

        tracing::debug!(
            backend_count = self.backends.len(),
            "No healthy backends in pool, routing to an ejected backend"
        );
        let start = self.fallback.fetch_add(1, Ordering::Relaxed);
        (0..self.backends.len())
            .map(|i| &self.backends[(start + i) % self.backends.len()])
            .find_map(|backend| backend.try_acquire())
    }

    pub fn backends(&self) -> &[Arc<Backend>] {
        &self.backends
    }

    pub fn policy(&self) -> LoadBalancerPolicy {
        self.policy
    }

    pub fn len(&self) -> usize {
        self.backends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }

    pub fn healthy_count(&self) -> usize {
        self.backends.iter().filter(|b| b.is_healthy()).count()
    }
}
