//! Application Layer
//!
//! Use cases orchestrating the domain ports.

mod registry_projector;
mod relay_service;

pub use registry_projector::RegistryProjector;
pub use relay_service::{RelayOutcome, RelayService};
