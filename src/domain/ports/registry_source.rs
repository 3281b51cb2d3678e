//! Registry Source Port
//!
//! The read-only face of the service registry. Everything the dashboard
//! shows is derived from these queries; nothing is cached on our side.

use crate::domain::entities::{HistoryEvent, InstanceRecord, RegistryApplication};
use async_trait::async_trait;

/// Read access to a service registry.
///
/// Implementations may be in-process (see
/// [`crate::adapters::outbound::InMemoryRegistry`]) or front a remote
/// registry. None of the queries fail: missing data is empty or `None`.
#[async_trait]
pub trait RegistrySource: Send + Sync {
    /// All known applications, sorted by name.
    async fn all_applications(&self) -> Vec<RegistryApplication>;

    /// A single application by exact name.
    async fn application_by_name(&self, name: &str) -> Option<RegistryApplication>;

    /// A single instance by application name and instance address.
    async fn instance_by_app_and_address(&self, app: &str, address: &str)
        -> Option<InstanceRecord>;

    /// Up to `n` most recent cancellations, newest first.
    async fn last_canceled(&self, n: usize) -> Vec<HistoryEvent>;

    /// Up to `n` most recent registrations, newest first.
    async fn last_registered(&self, n: usize) -> Vec<HistoryEvent>;
}
