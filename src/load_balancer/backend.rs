//! Backend abstraction.
//!
//! # Responsibilities
//! - Represent a single backend server of a service pool
//! - Track active connections (for Least Connections LB)
//! - Enforce max connection limits
//! - Track health state (Unknown/Healthy/Unhealthy)

use std::net::SocketAddr;
use std::ops::Deref;
use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};
use std::sync::Arc;

use crate::health::state::HealthState;

/// A single backend server.
#[derive(Debug)]
pub struct Backend {
    /// The address of the backend.
    pub addr: SocketAddr,
    /// Maximum concurrent connections allowed.
    pub max_connections: usize,
    active_connections: AtomicUsize,
    state: AtomicU8,
    consecutive_failures: AtomicUsize,
    consecutive_successes: AtomicUsize,
}

impl Backend {
    /// Create a new backend.
    pub fn new(addr: SocketAddr, max_connections: usize) -> Self {
        Self {
            addr,
            max_connections,
            active_connections: AtomicUsize::new(0),
            state: AtomicU8::new(HealthState::Unknown as u8),
            consecutive_failures: AtomicUsize::new(0),
            consecutive_successes: AtomicUsize::new(0),
        }
    }

    /// Get the current number of active connections.
    pub fn active_connections(&self) -> usize {
        self.active_connections.load(Ordering::Relaxed)
    }

    /// Reserve a connection slot; `None` when the backend is at its limit.
    pub fn try_acquire(self: &Arc<Self>) -> Option<BackendConnectionGuard> {
        let mut prev = self.active_connections.load(Ordering::Relaxed);
        loop {
            if prev >= self.max_connections {
                return None;
            }
            match self.active_connections.compare_exchange_weak(
                prev,
                prev + 1,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(x) => prev = x,
            }
        }
        Some(BackendConnectionGuard {
            backend: self.clone(),
        })
    }

    // --- Health Logic ---

    pub fn health(&self) -> HealthState {
        HealthState::from(self.state.load(Ordering::Relaxed))
    }

    /// Return true if backend is considered healthy (Healthy or Unknown).
    pub fn is_healthy(&self) -> bool {
        self.health().is_routable()
    }

    /// Report a successful request/check. Returns true on a transition to Healthy.
    pub fn mark_success(&self, healthy_threshold: usize) -> bool {
        self.consecutive_failures.store(0, Ordering::Relaxed);

        if self.health() == HealthState::Healthy {
            return false;
        }

        let successes = self.consecutive_successes.fetch_add(1, Ordering::Relaxed) + 1;
        if successes >= healthy_threshold {
            self.state.store(HealthState::Healthy as u8, Ordering::Relaxed);
            self.consecutive_successes.store(0, Ordering::Relaxed);
            tracing::info!(backend = %self.addr, "Backend marked healthy");
            return true;
        }
        false
    }

    /// Report a failed request/check. Returns true on a transition to Unhealthy.
    pub fn mark_failure(&self, unhealthy_threshold: usize) -> bool {
        self.consecutive_successes.store(0, Ordering::Relaxed);

        if self.health() == HealthState::Unhealthy {
            return false;
        }

        let failures = self.consecutive_failures.fetch_add(1, Ordering::Relaxed) + 1;
        if failures >= unhealthy_threshold {
            self.state.store(HealthState::Unhealthy as u8, Ordering::Relaxed);
            self.consecutive_failures.store(0, Ordering::Relaxed);
            tracing::warn!(backend = %self.addr, failures, "Backend marked unhealthy");
            return true;
        }
        false
    }
}

/// A RAII guard that holds one connection slot on a backend.
#[derive(Debug)]
pub struct BackendConnectionGuard {
    backend: Arc<Backend>,
}

impl BackendConnectionGuard {
    pub fn backend(&self) -> &Arc<Backend> {
        &self.backend
    }
}

impl Deref for BackendConnectionGuard {
    type Target = Backend;
    fn deref(&self) -> &Self::Target {
        &self.backend
    }
}

impl Drop for BackendConnectionGuard {
    fn drop(&mut self) {
        self.backend.active_connections.fetch_sub(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend(max: usize) -> Arc<Backend> {
        Arc::new(Backend::new("127.0.0.1:8080".parse().unwrap(), max))
    }

    #[test]
    fn test_connection_limit() {
        let b = backend(2);
        let g1 = b.try_acquire().unwrap();
        let _g2 = b.try_acquire().unwrap();
        assert!(b.try_acquire().is_none());
        assert_eq!(b.active_connections(), 2);

        drop(g1);
        assert_eq!(b.active_connections(), 1);
        assert!(b.try_acquire().is_some());
    }

    #[test]
    fn test_health_hysteresis() {
        let b = backend(10);
        assert_eq!(b.health(), HealthState::Unknown);
        assert!(b.is_healthy());

        assert!(!b.mark_failure(2));
        assert!(b.is_healthy());
        assert!(b.mark_failure(2));
        assert!(!b.is_healthy());

        // A single success is not enough to recover.
        assert!(!b.mark_success(2));
        assert!(!b.is_healthy());
        assert!(b.mark_success(2));
        assert_eq!(b.health(), HealthState::Healthy);
    }

    #[test]
    fn test_success_resets_failure_streak() {
        let b = backend(10);
        b.mark_failure(2);
        b.mark_success(5);
        assert!(!b.mark_failure(2));
        assert!(b.is_healthy());
    }
}
