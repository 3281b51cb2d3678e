//! Infrastructure Layer
//!
//! Cross-cutting concerns shared by the relay and the HTTP server.

pub mod headers;
pub mod shutdown;

pub use headers::forwardable_headers;
pub use shutdown::{shutdown_signal, RelayGuard, ShutdownController};
