//! Adapters
//!
//! Inbound adapters drive the application (HTTP API); outbound adapters
//! implement the domain ports (registry, upstream HTTP).

pub mod inbound;
pub mod outbound;
