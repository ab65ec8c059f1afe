//! Per-service construction state.
//!
//! # State Transitions
//! ```text
//! Unloaded → Loading          first caller claims the entry
//! Loading  → Loaded           factory succeeded (terminal, cached)
//! Loading  → Unloaded         factory failed or panicked (reported as Failed
//!                             until the next claim)
//! ```
//!
//! Every claim while Loading receives a clone of the attempt's completion
//! channel, so all callers of one attempt see the same outcome.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use serde::Serialize;
use tokio::sync::watch;

use crate::error::ClientConstructionError;
use crate::observability::metrics;
use crate::registry::context::ClientContext;
use crate::registry::service_registry::ClientFactory;

/// Outcome of one construction attempt, shared by every waiter.
pub type Construction = Result<Arc<ClientContext>, ClientConstructionError>;

type Completion = watch::Receiver<Option<Construction>>;

/// Observable state of a registry entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryState {
    Unloaded,
    Loading,
    Loaded,
    /// Last attempt failed; the next request retries.
    Failed,
}

/// Diagnostics view of one service's client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClientStatus {
    pub service_id: String,
    pub state: EntryState,
    /// Client contexts successfully constructed.
    pub constructions: u64,
    /// Factory invocations, successful or not.
    pub attempts: u64,
    pub failures: u64,
    pub last_error: Option<String>,
    pub servers: usize,
    pub healthy_servers: usize,
}

impl ClientStatus {
    pub(crate) fn unloaded(service_id: &str) -> Self {
        Self {
            service_id: service_id.to_string(),
            state: EntryState::Unloaded,
            constructions: 0,
            attempts: 0,
            failures: 0,
            last_error: None,
            servers: 0,
            healthy_servers: 0,
        }
    }
}

enum Slot {
    Unloaded,
    Loading(Completion),
    Loaded(Arc<ClientContext>),
}

struct Inner {
    slot: Slot,
    last_error: Option<ClientConstructionError>,
}

pub(crate) struct RegistryEntry {
    service_id: String,
    inner: Mutex<Inner>,
    attempts: AtomicU64,
    constructions: AtomicU64,
    failures: AtomicU64,
}

/// What a caller must do after claiming an entry.
pub(crate) enum Claim {
    Ready(Arc<ClientContext>),
    Join(Completion),
    Construct(Attempt),
}

impl RegistryEntry {
    pub(crate) fn new(service_id: &str) -> Arc<Self> {
        Arc::new(Self {
            service_id: service_id.to_string(),
            inner: Mutex::new(Inner {
                slot: Slot::Unloaded,
                last_error: None,
            }),
            attempts: AtomicU64::new(0),
            constructions: AtomicU64::new(0),
            failures: AtomicU64::new(0),
        })
    }

    // The lock never spans user code, so a poisoned guard still holds a consistent slot.
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn claim(self: &Arc<Self>) -> Claim {
        let mut inner = self.lock();
        match &inner.slot {
            Slot::Loaded(ctx) => Claim::Ready(ctx.clone()),
            Slot::Loading(completion) => Claim::Join(completion.clone()),
            Slot::Unloaded => {
                let (tx, rx) = watch::channel(None);
                inner.slot = Slot::Loading(rx);
                Claim::Construct(Attempt {
                    entry: self.clone(),
                    tx,
                    started: Instant::now(),
                    completed: false,
                })
            }
        }
    }

    pub(crate) fn loaded(&self) -> Option<Arc<ClientContext>> {
        match &self.lock().slot {
            Slot::Loaded(ctx) => Some(ctx.clone()),
            _ => None,
        }
    }

    pub(crate) fn state(&self) -> EntryState {
        let inner = self.lock();
        match (&inner.slot, &inner.last_error) {
            (Slot::Loaded(_), _) => EntryState::Loaded,
            (Slot::Loading(_), _) => EntryState::Loading,
            (Slot::Unloaded, Some(_)) => EntryState::Failed,
            (Slot::Unloaded, None) => EntryState::Unloaded,
        }
    }

    pub(crate) fn constructions(&self) -> u64 {
        self.constructions.load(Ordering::SeqCst)
    }

    pub(crate) fn status(&self) -> ClientStatus {
        let (servers, healthy_servers) = self
            .loaded()
            .map(|ctx| (ctx.pool().len(), ctx.pool().healthy_count()))
            .unwrap_or((0, 0));
        let last_error = self.lock().last_error.as_ref().map(ToString::to_string);
        ClientStatus {
            service_id: self.service_id.clone(),
            state: self.state(),
            constructions: self.constructions(),
            attempts: self.attempts.load(Ordering::SeqCst),
            failures: self.failures.load(Ordering::SeqCst),
            last_error,
            servers,
            healthy_servers,
        }
    }
}

/// The right to run the factory once; publishes its outcome exactly once.
///
/// Dropping an attempt that never completed (factory panic, task never run)
/// publishes a failure and resets the entry, so it cannot stay Loading.
pub(crate) struct Attempt {
    entry: Arc<RegistryEntry>,
    tx: watch::Sender<Option<Construction>>,
    started: Instant,
    completed: bool,
}

impl Attempt {
    pub(crate) fn subscribe(&self) -> Completion {
        self.tx.subscribe()
    }

    /// Invoke the factory and publish the result.
    pub(crate) fn run(mut self, factory: &ClientFactory) -> Construction {
        let service_id = self.entry.service_id.clone();
        self.entry.attempts.fetch_add(1, Ordering::SeqCst);

        let outcome = factory()
            .map(Arc::new)
            .map_err(|e| ClientConstructionError::Factory {
                service_id: service_id.clone(),
                message: e.to_string(),
            });

        if let Ok(ctx) = &outcome {
            if ctx.service_id() != service_id {
                tracing::warn!(
                    service_id = %service_id,
                    context_service_id = %ctx.service_id(),
                    "Factory built a context under a different service id"
                );
            }
        }

        self.complete(outcome.clone());
        outcome
    }

    fn complete(&mut self, outcome: Construction) {
        let service_id = &self.entry.service_id;
        {
            let mut inner = self.entry.lock();
            match &outcome {
                Ok(ctx) => {
                    inner.slot = Slot::Loaded(ctx.clone());
                    inner.last_error = None;
                    self.entry.constructions.fetch_add(1, Ordering::SeqCst);
                }
                Err(e) => {
                    inner.slot = Slot::Unloaded;
                    inner.last_error = Some(e.clone());
                    self.entry.failures.fetch_add(1, Ordering::SeqCst);
                }
            }
        }

        let elapsed = self.started.elapsed();
        match &outcome {
            Ok(ctx) => {
                tracing::info!(
                    service_id = %service_id,
                    servers = ctx.pool().len(),
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Service client constructed"
                );
                metrics::record_client_construction(service_id, "success", elapsed);
            }
            Err(e) => {
                tracing::error!(
                    service_id = %service_id,
                    error = %e,
                    "Service client construction failed; next request will retry"
                );
                metrics::record_client_construction(service_id, "failure", elapsed);
            }
        }

        self.completed = true;
        self.tx.send_replace(Some(outcome));
    }
}

impl Drop for Attempt {
    fn drop(&mut self) {
        if self.completed {
            return;
        }
        let service_id = self.entry.service_id.clone();
        let error = if std::thread::panicking() {
            ClientConstructionError::Panicked { service_id }
        } else {
            ClientConstructionError::Abandoned { service_id }
        };
        self.complete(Err(error));
    }
}

/// Wait for an attempt's outcome.
pub(crate) async fn wait(service_id: &str, mut completion: Completion) -> Construction {
    let outcome = completion
        .wait_for(Option::is_some)
        .await
        .ok()
        .and_then(|value| value.clone());

    outcome.unwrap_or_else(|| {
        Err(ClientConstructionError::Abandoned {
            service_id: service_id.to_string(),
        })
    })
}
