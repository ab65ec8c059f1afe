//! Request dispatch subsystem.
//!
//! # Data Flow
//! ```text
//! Inbound request
//!     → context.rs (fresh RequestContext, released on every exit)
//!     → RouteTable::resolve (404 on miss)
//!     → ServiceClientRegistry::get_or_create (503 on construction failure)
//!     → ServerPool::select (503 when no backend is available)
//!     → transport.rs (502 on failure, 504 on timeout)
//! ```

pub mod context;
pub mod dispatcher;
pub mod transport;

pub use context::RequestContext;
pub use dispatcher::ProxyDispatcher;
pub use transport::{HttpTransport, Transport};
