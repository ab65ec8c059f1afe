//! Service client registry.
//!
//! # Data Flow
//! ```text
//! Startup:
//!     ServiceClientConfig[] → register_config (eager ones construct now)
//!
//! Request:
//!     service_id → get_or_create
//!         Loaded   → cached ClientContext
//!         Loading  → wait for the in-flight attempt
//!         Unloaded → run factory once, publish outcome to all waiters
//! ```

pub mod context;
pub mod entry;
pub mod service_registry;

pub use context::{ClientContext, ClientContextBuilder, ServerList, StaticServerList};
pub use entry::{ClientStatus, EntryState};
pub use service_registry::{
    ClientFactory, RegistrationError, ServiceClientConfig, ServiceClientRegistry,
};
