//! Registry Dashboard Library
//!
//! This module exposes the dashboard components for use in integration tests
//! and as a library.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;

// Re-export commonly used types
pub use application::{RegistryProjector, RelayOutcome, RelayService};
pub use config::load_config;
pub use domain::entities::{Application, Instance, InstanceHistory, InstanceRecord};
pub use domain::ports::{ApplicationRepository, RegistrySource, UpstreamClient};
pub use domain::services::ManagementUrlResolver;
pub use domain::value_objects::{InstanceId, InstanceStatus, ManagementPath};
