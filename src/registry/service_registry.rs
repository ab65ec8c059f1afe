//! Keyed lazy-singleton cache of service client contexts.
//!
//! # Responsibilities
//! - Hold one factory per service id, registered before traffic
//! - Construct each service's client context at most once per successful attempt
//! - Coalesce concurrent first requests onto the in-flight construction
//! - Reset failed attempts so a later request retries
//!
//! # Design Decisions
//! - Factories are fixed after startup (`register_config` takes `&mut self`)
//! - Entries live in a sharded `DashMap`; each entry has its own short lock,
//!   so different services never contend on one global lock
//! - Lazy construction runs on the blocking pool, detached from the caller;
//!   a cancelled request cannot leave an entry in Loading
//! - Unknown service ids fail without creating an entry

use std::collections::HashMap;
use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;

use dashmap::DashMap;
use thiserror::Error;

use crate::config::ServiceConfig;
use crate::error::{BoxError, ClientConstructionError};
use crate::registry::context::{ClientContext, StaticServerList};
use crate::registry::entry::{self, Claim, ClientStatus, EntryState, RegistryEntry};

/// Constructor closure producing a service's client context.
pub type ClientFactory = Arc<dyn Fn() -> Result<ClientContext, BoxError> + Send + Sync>;

/// A service id bound to its factory.
#[derive(Clone)]
pub struct ServiceClientConfig {
    service_id: String,
    factory: ClientFactory,
}

impl ServiceClientConfig {
    pub fn new<F>(service_id: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> Result<ClientContext, BoxError> + Send + Sync + 'static,
    {
        Self {
            service_id: service_id.into(),
            factory: Arc::new(factory),
        }
    }

    /// Factory building a static pool from a configured service.
    pub fn from_service(config: &ServiceConfig) -> Self {
        let service = config.clone();
        Self::new(config.id.clone(), move || {
            let servers = service
                .servers
                .iter()
                .map(|s| s.parse::<SocketAddr>())
                .collect::<Result<Vec<_>, _>>()?;
            ClientContext::builder(service.id.clone())
                .server_list(StaticServerList::new(servers))
                .policy(service.load_balancer)
                .max_connections(service.max_connections)
                .build()
        })
    }

    pub fn service_id(&self) -> &str {
        &self.service_id
    }
}

impl fmt::Debug for ServiceClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceClientConfig")
            .field("service_id", &self.service_id)
            .finish_non_exhaustive()
    }
}

/// Startup-time registration failures.
#[derive(Debug, Error)]
pub enum RegistrationError {
    #[error("service '{0}' is already registered")]
    AlreadyRegistered(String),

    #[error("eager construction failed: {0}")]
    EagerLoad(#[from] ClientConstructionError),
}

/// Service id → client context, built on first use.
#[derive(Default)]
pub struct ServiceClientRegistry {
    factories: HashMap<String, ClientFactory>,
    entries: DashMap<String, Arc<RegistryEntry>>,
}

impl ServiceClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a service's factory. With `eager`, construct it now.
    pub fn register_config(
        &mut self,
        config: ServiceClientConfig,
        eager: bool,
    ) -> Result<(), RegistrationError> {
        let ServiceClientConfig {
            service_id,
            factory,
        } = config;
        if self.factories.contains_key(&service_id) {
            return Err(RegistrationError::AlreadyRegistered(service_id));
        }
        self.factories.insert(service_id.clone(), factory.clone());

        if !eager {
            tracing::debug!(service_id = %service_id, "Service client registered (lazy)");
            return Ok(());
        }

        // No traffic yet: construct inline on the calling thread.
        if let Claim::Construct(attempt) = self.entry(&service_id).claim() {
            attempt.run(&factory)?;
        }
        tracing::info!(service_id = %service_id, "Service client registered (eager)");
        Ok(())
    }

    /// Fetch the service's client context, constructing it on first use.
    pub async fn get_or_create(
        &self,
        service_id: &str,
    ) -> Result<Arc<ClientContext>, ClientConstructionError> {
        let factory = self.factories.get(service_id).ok_or_else(|| {
            ClientConstructionError::UnknownService {
                service_id: service_id.to_string(),
            }
        })?;

        let completion = match self.entry(service_id).claim() {
            Claim::Ready(ctx) => return Ok(ctx),
            Claim::Join(completion) => {
                tracing::debug!(
                    service_id = %service_id,
                    "Joining in-flight client construction"
                );
                completion
            }
            Claim::Construct(attempt) => {
                tracing::info!(
                    service_id = %service_id,
                    "Constructing service client on first use"
                );
                let completion = attempt.subscribe();
                let factory = factory.clone();
                tokio::task::spawn_blocking(move || {
                    let _ = attempt.run(&factory);
                });
                completion
            }
        };

        entry::wait(service_id, completion).await
    }

    fn entry(&self, service_id: &str) -> Arc<RegistryEntry> {
        if let Some(entry) = self.entries.get(service_id) {
            return entry.value().clone();
        }
        self.entries
            .entry(service_id.to_string())
            .or_insert_with(|| RegistryEntry::new(service_id))
            .value()
            .clone()
    }

    pub fn is_registered(&self, service_id: &str) -> bool {
        self.factories.contains_key(service_id)
    }

    /// Registered service ids, sorted.
    pub fn service_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    /// Current state; `None` for unregistered ids.
    pub fn state(&self, service_id: &str) -> Option<EntryState> {
        if !self.is_registered(service_id) {
            return None;
        }
        Some(
            self.entries
                .get(service_id)
                .map(|e| e.state())
                .unwrap_or(EntryState::Unloaded),
        )
    }

    /// Number of client contexts constructed for the service.
    pub fn construction_count(&self, service_id: &str) -> u64 {
        self.entries
            .get(service_id)
            .map(|e| e.constructions())
            .unwrap_or(0)
    }

    pub fn status(&self, service_id: &str) -> Option<ClientStatus> {
        if !self.is_registered(service_id) {
            return None;
        }
        Some(
            self.entries
                .get(service_id)
                .map(|e| e.status())
                .unwrap_or_else(|| ClientStatus::unloaded(service_id)),
        )
    }

    /// Status of every registered service, sorted by id.
    pub fn snapshot(&self) -> Vec<ClientStatus> {
        self.service_ids()
            .into_iter()
            .filter_map(|id| self.status(id))
            .collect()
    }

    /// Client contexts constructed so far.
    pub fn loaded_contexts(&self) -> Vec<Arc<ClientContext>> {
        self.entries.iter().filter_map(|e| e.value().loaded()).collect()
    }
}

impl fmt::Debug for ServiceClientRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceClientRegistry")
            .field("services", &self.service_ids())
            .field("entries", &self.entries.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn counting(
        service_id: &'static str,
        counter: Arc<AtomicUsize>,
        delay: Duration,
    ) -> ServiceClientConfig {
        ServiceClientConfig::new(service_id, move || {
            std::thread::sleep(delay);
            counter.fetch_add(1, Ordering::SeqCst);
            ClientContext::builder(service_id).build()
        })
    }

    /// Fails (or panics) on the first invocation, succeeds afterwards.
    fn flaky(counter: Arc<AtomicUsize>, panic_first: bool) -> ServiceClientConfig {
        ServiceClientConfig::new("flaky", move || {
            std::thread::sleep(Duration::from_millis(50));
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                if panic_first {
                    panic!("factory exploded");
                }
                return Err("backend config unavailable".into());
            }
            ClientContext::builder("flaky").build()
        })
    }

    #[test]
    fn lazy_registration_constructs_nothing() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut registry = ServiceClientRegistry::new();
        registry
            .register_config(counting("lazy", counter.clone(), Duration::ZERO), false)
            .unwrap();

        assert_eq!(counter.load(Ordering::SeqCst), 0);
        assert_eq!(registry.construction_count("lazy"), 0);
        assert_eq!(registry.state("lazy"), Some(EntryState::Unloaded));
        assert!(registry.loaded_contexts().is_empty());
    }

    #[test]
    fn eager_registration_constructs_immediately() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut registry = ServiceClientRegistry::new();
        registry
            .register_config(counting("eager", counter.clone(), Duration::ZERO), true)
            .unwrap();

        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert_eq!(registry.state("eager"), Some(EntryState::Loaded));
        assert_eq!(registry.construction_count("eager"), 1);
    }

    #[test]
    fn eager_failure_is_reported() {
        let mut registry = ServiceClientRegistry::new();
        let err = registry
            .register_config(
                ServiceClientConfig::new("broken", || Err("no servers".into())),
                true,
            )
            .unwrap_err();
        assert!(matches!(
            err,
            RegistrationError::EagerLoad(ClientConstructionError::Factory { .. })
        ));
        assert_eq!(registry.state("broken"), Some(EntryState::Failed));
    }

    #[test]
    fn duplicate_registration_rejected() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut registry = ServiceClientRegistry::new();
        registry
            .register_config(counting("svc", counter.clone(), Duration::ZERO), false)
            .unwrap();
        let err = registry
            .register_config(counting("svc", counter, Duration::ZERO), false)
            .unwrap_err();
        assert!(matches!(err, RegistrationError::AlreadyRegistered(id) if id == "svc"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_first_requests_construct_once() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut registry = ServiceClientRegistry::new();
        registry
            .register_config(counting("lazy", counter.clone(), Duration::from_millis(100)), false)
            .unwrap();
        let registry = Arc::new(registry);

        let tasks: Vec<_> = (0..32)
            .map(|_| {
                let registry = registry.clone();
                tokio::spawn(async move { registry.get_or_create("lazy").await.unwrap() })
            })
            .collect();

        let mut contexts = Vec::new();
        for task in tasks {
            contexts.push(task.await.unwrap());
        }

        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert_eq!(registry.construction_count("lazy"), 1);
        assert!(contexts.iter().all(|c| Arc::ptr_eq(c, &contexts[0])));
        assert_eq!(registry.state("lazy"), Some(EntryState::Loaded));
    }

    #[tokio::test]
    async fn loaded_context_is_reused() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut registry = ServiceClientRegistry::new();
        registry
            .register_config(counting("lazy", counter.clone(), Duration::ZERO), false)
            .unwrap();

        let first = registry.get_or_create("lazy").await.unwrap();
        for _ in 0..10 {
            let again = registry.get_or_create("lazy").await.unwrap();
            assert!(Arc::ptr_eq(&first, &again));
        }
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert_eq!(registry.construction_count("lazy"), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn failure_reaches_all_waiters_then_retries() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut registry = ServiceClientRegistry::new();
        registry.register_config(flaky(counter.clone(), false), false).unwrap();
        let registry = Arc::new(registry);

        let tasks: Vec<_> = (0..4)
            .map(|_| {
                let registry = registry.clone();
                tokio::spawn(async move { registry.get_or_create("flaky").await })
            })
            .collect();
        for task in tasks {
            let err = task.await.unwrap().unwrap_err();
            assert!(matches!(err, ClientConstructionError::Factory { .. }));
        }
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert_eq!(registry.state("flaky"), Some(EntryState::Failed));

        registry.get_or_create("flaky").await.unwrap();
        let status = registry.status("flaky").unwrap();
        assert_eq!(status.state, EntryState::Loaded);
        assert_eq!(status.attempts, 2);
        assert_eq!(status.constructions, 1);
        assert_eq!(status.failures, 1);
        assert_eq!(status.last_error, None);
    }

    #[tokio::test]
    async fn panicking_factory_does_not_poison_entry() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut registry = ServiceClientRegistry::new();
        registry.register_config(flaky(counter.clone(), true), false).unwrap();

        let err = registry.get_or_create("flaky").await.unwrap_err();
        assert_eq!(
            err,
            ClientConstructionError::Panicked {
                service_id: "flaky".into()
            }
        );
        assert_eq!(registry.state("flaky"), Some(EntryState::Failed));

        assert!(registry.get_or_create("flaky").await.is_ok());
        assert_eq!(registry.construction_count("flaky"), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn cancelled_trigger_lets_construction_finish() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut registry = ServiceClientRegistry::new();
        registry
            .register_config(counting("lazy", counter.clone(), Duration::from_millis(200)), false)
            .unwrap();
        let registry = Arc::new(registry);

        let trigger = {
            let registry = registry.clone();
            tokio::spawn(async move { registry.get_or_create("lazy").await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        trigger.abort();
        assert!(trigger.await.unwrap_err().is_cancelled());

        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        while registry.state("lazy") != Some(EntryState::Loaded) {
            assert!(
                tokio::time::Instant::now() < deadline,
                "entry stuck in {:?}",
                registry.state("lazy")
            );
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        registry.get_or_create("lazy").await.unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn services_construct_independently() {
        let slow_counter = Arc::new(AtomicUsize::new(0));
        let fast_counter = Arc::new(AtomicUsize::new(0));
        let mut registry = ServiceClientRegistry::new();
        registry
            .register_config(counting("slow", slow_counter, Duration::from_millis(500)), false)
            .unwrap();
        registry
            .register_config(counting("fast", fast_counter, Duration::ZERO), false)
            .unwrap();
        let registry = Arc::new(registry);

        let slow = {
            let registry = registry.clone();
            tokio::spawn(async move { registry.get_or_create("slow").await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(registry.state("slow"), Some(EntryState::Loading));

        let fast =
            tokio::time::timeout(Duration::from_millis(250), registry.get_or_create("fast")).await;
        assert!(fast.expect("fast service blocked behind slow one").is_ok());

        slow.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn unknown_service_creates_no_entry() {
        let registry = ServiceClientRegistry::new();
        let err = registry.get_or_create("ghost").await.unwrap_err();
        assert!(matches!(err, ClientConstructionError::UnknownService { .. }));
        assert_eq!(registry.state("ghost"), None);
        assert!(registry.snapshot().is_empty());
    }

    #[test]
    fn factory_from_service_config() {
        let service = ServiceConfig::new(
            "orders",
            vec!["127.0.0.1:3001".into(), "127.0.0.1:3002".into()],
        );
        let mut registry = ServiceClientRegistry::new();
        registry
            .register_config(ServiceClientConfig::from_service(&service), true)
            .unwrap();

        let status = registry.status("orders").unwrap();
        assert_eq!(status.servers, 2);
        assert_eq!(status.healthy_servers, 2);
        assert_eq!(registry.snapshot().len(), 1);
    }
}
