//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Request to backend:
//!     → timeouts.rs (per-attempt deadline)
//!     → On failure: retries.rs (retryable? budget left?)
//!     → backoff.rs (jittered delay before the next attempt)
//! ```
//!
//! # Design Decisions
//! - Every upstream call has a deadline
//! - Retries only for idempotent requests on routes that opt in
//! - A shared budget caps retries as a fraction of traffic

pub mod backoff;
pub mod retries;
pub mod timeouts;

pub use backoff::calculate_backoff;
pub use retries::{is_retryable, RetryBudget};
pub use timeouts::with_deadline;
