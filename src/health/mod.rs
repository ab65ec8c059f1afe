//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! Active health checks (active.rs):
//!     Periodic timer
//!     → Probe each backend of every *loaded* client context
//!     → Update backend state
//!
//! Passive health checks (passive.rs):
//!     Proxied request outcome observed
//!     → Count consecutive failures/successes
//!     → Update backend state on threshold
//! ```
//!
//! # Design Decisions
//! - Active checks never construct a client; unloaded services are skipped
//! - State transitions require consecutive successes/failures
//! - Health state is per-backend, not per-pool

pub mod active;
pub mod passive;
pub mod state;

pub use active::HealthMonitor;
pub use state::HealthState;
