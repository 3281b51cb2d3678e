//! Application Repository Port
//!
//! Public-view queries over the registry. The HTTP layer and the relay
//! only ever talk to this trait, never to a [`super::RegistrySource`].

use crate::domain::entities::{Application, Instance, InstanceHistory};
use crate::domain::errors::RepositoryError;
use crate::domain::value_objects::InstanceId;
use async_trait::async_trait;

#[async_trait]
pub trait ApplicationRepository: Send + Sync {
    /// All applications with their instances sorted by name.
    async fn find_all(&self) -> Result<Vec<Application>, RepositoryError>;

    /// One application by name; `None` when the registry does not know it.
    async fn find_by_name(&self, name: &str) -> Result<Option<Application>, RepositoryError>;

    /// One instance by its opaque identifier.
    async fn find_instance(&self, id: &InstanceId) -> Result<Option<Instance>, RepositoryError>;

    /// Base management URL of an instance.
    async fn instance_management_url(
        &self,
        id: &InstanceId,
    ) -> Result<Option<String>, RepositoryError>;

    /// Aggregated circuit-breaker stream for an application.
    async fn application_circuit_breaker_stream_url(
        &self,
        name: &str,
    ) -> Result<Option<String>, RepositoryError>;

    /// Circuit-breaker stream served by a single instance.
    async fn instance_circuit_breaker_stream_url(
        &self,
        id: &InstanceId,
    ) -> Result<Option<String>, RepositoryError>;

    async fn canceled_history(&self) -> Vec<InstanceHistory>;

    async fn registered_history(&self) -> Vec<InstanceHistory>;
}
