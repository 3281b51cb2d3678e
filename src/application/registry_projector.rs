//! Registry Projector - read use cases
//!
//! Maps registry-native records into the public view model. Every call
//! re-reads the registry, so results are exactly as fresh as the source.

use crate::domain::entities::{Application, Instance, InstanceHistory, InstanceRecord, RegistryApplication};
use crate::domain::errors::RepositoryError;
use crate::domain::ports::{ApplicationRepository, RegistrySource};
use crate::domain::services::ManagementUrlResolver;
use crate::domain::value_objects::InstanceId;
use async_trait::async_trait;
use std::sync::Arc;

/// Suffix of the circuit-breaker stream served by each instance.
const INSTANCE_STREAM_SUFFIX: &str = "/hystrix.stream";

/// [`ApplicationRepository`] backed by a [`RegistrySource`].
pub struct RegistryProjector {
    source: Arc<dyn RegistrySource>,
    /// Aggregated stream endpoint, e.g. `http://localhost:8080/turbine.stream`
    turbine_url: String,
    /// Number of history events requested from the source
    history_window: usize,
}

impl RegistryProjector {
    pub fn new(source: Arc<dyn RegistrySource>, turbine_url: String, history_window: usize) -> Self {
        Self {
            source,
            turbine_url,
            history_window,
        }
    }

    fn to_instance(record: &InstanceRecord) -> Result<Instance, RepositoryError> {
        let id = record.instance_id();
        let url = ManagementUrlResolver::status_page_base(id.as_str(), &record.status_page_url)?;
        Ok(Instance {
            id,
            name: record.address.clone(),
            url,
            status: record.status,
        })
    }

    fn to_application(app: RegistryApplication) -> Result<Application, RepositoryError> {
        let mut instances = app
            .instances
            .iter()
            .map(Self::to_instance)
            .collect::<Result<Vec<_>, _>>()?;
        instances.sort_by(|a, b| a.name.cmp(&b.name));

        Ok(Application {
            name: app.name,
            instances,
        })
    }

    async fn find_record(&self, id: &InstanceId) -> Option<InstanceRecord> {
        let (app, address) = id.decode();
        let record = self.source.instance_by_app_and_address(&app, &address).await;
        if record.is_none() {
            tracing::debug!("no instance for id {} (app={} address={})", id, app, address);
        }
        record
    }
}

#[async_trait]
impl ApplicationRepository for RegistryProjector {
    async fn find_all(&self) -> Result<Vec<Application>, RepositoryError> {
        self.source
            .all_applications()
            .await
            .into_iter()
            .map(Self::to_application)
            .collect()
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Application>, RepositoryError> {
        self.source
            .application_by_name(name)
            .await
            .map(Self::to_application)
            .transpose()
    }

    async fn find_instance(&self, id: &InstanceId) -> Result<Option<Instance>, RepositoryError> {
        self.find_record(id)
            .await
            .as_ref()
            .map(Self::to_instance)
            .transpose()
    }

    async fn instance_management_url(
        &self,
        id: &InstanceId,
    ) -> Result<Option<String>, RepositoryError> {
        self.find_record(id)
            .await
            .as_ref()
            .map(ManagementUrlResolver::resolve)
            .transpose()
    }

    async fn application_circuit_breaker_stream_url(
        &self,
        name: &str,
    ) -> Result<Option<String>, RepositoryError> {
        Ok(self
            .find_by_name(name)
            .await?
            .map(|app| format!("{}?cluster={}", self.turbine_url, app.name)))
    }

    async fn instance_circuit_breaker_stream_url(
        &self,
        id: &InstanceId,
    ) -> Result<Option<String>, RepositoryError> {
        Ok(self
            .instance_management_url(id)
            .await?
            .map(|url| format!("{}{}", url, INSTANCE_STREAM_SUFFIX)))
    }

    async fn canceled_history(&self) -> Vec<InstanceHistory> {
        self.source
            .last_canceled(self.history_window)
            .await
            .into_iter()
            .map(InstanceHistory::from)
            .collect()
    }

    async fn registered_history(&self) -> Vec<InstanceHistory> {
        self.source
            .last_registered(self.history_window)
            .await
            .into_iter()
            .map(InstanceHistory::from)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::HistoryEvent;
    use crate::domain::value_objects::InstanceStatus;
    use chrono::{TimeZone, Utc};
    use std::sync::Mutex;

    // ===== Mock Implementations =====

    #[derive(Default)]
    struct MockRegistry {
        apps: Vec<RegistryApplication>,
        canceled: Vec<HistoryEvent>,
        registered: Vec<HistoryEvent>,
        requested_window: Mutex<Option<usize>>,
    }

    #[async_trait]
    impl RegistrySource for MockRegistry {
        async fn all_applications(&self) -> Vec<RegistryApplication> {
            self.apps.clone()
        }

        async fn application_by_name(&self, name: &str) -> Option<RegistryApplication> {
            self.apps.iter().find(|a| a.name == name).cloned()
        }

        async fn instance_by_app_and_address(
            &self,
            app: &str,
            address: &str,
        ) -> Option<InstanceRecord> {
            self.apps
                .iter()
                .filter(|a| a.name == app)
                .flat_map(|a| a.instances.iter())
                .find(|i| i.address == address)
                .cloned()
        }

        async fn last_canceled(&self, n: usize) -> Vec<HistoryEvent> {
            *self.requested_window.lock().unwrap() = Some(n);
            self.canceled.iter().take(n).cloned().collect()
        }

        async fn last_registered(&self, n: usize) -> Vec<HistoryEvent> {
            *self.requested_window.lock().unwrap() = Some(n);
            self.registered.iter().take(n).cloned().collect()
        }
    }

    // ===== Test Helpers =====

    fn record(app: &str, address: &str) -> InstanceRecord {
        InstanceRecord::new(
            app,
            address,
            &format!("http://{}:8080/info", address),
            InstanceStatus::Up,
        )
    }

    fn app(name: &str, instances: Vec<InstanceRecord>) -> RegistryApplication {
        RegistryApplication {
            name: name.to_string(),
            instances,
        }
    }

    fn projector(registry: MockRegistry) -> RegistryProjector {
        RegistryProjector::new(
            Arc::new(registry),
            "http://localhost:8080/turbine.stream".to_string(),
            50,
        )
    }

    fn event(millis: i64, description: &str) -> HistoryEvent {
        HistoryEvent {
            timestamp: Utc.timestamp_millis_opt(millis).unwrap(),
            description: description.to_string(),
        }
    }

    // ===== find_all Tests =====

    #[tokio::test]
    async fn test_find_all_sorts_instances_by_name() {
        let registry = MockRegistry {
            apps: vec![app(
                "BILLING",
                vec![record("BILLING", "10.0.0.3"), record("BILLING", "10.0.0.1"), record("BILLING", "10.0.0.2")],
            )],
            ..Default::default()
        };

        let apps = projector(registry).find_all().await.unwrap();

        let names: Vec<_> = apps[0].instances.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["10.0.0.1", "10.0.0.2", "10.0.0.3"]);
    }

    #[tokio::test]
    async fn test_find_all_keeps_source_application_order() {
        let registry = MockRegistry {
            apps: vec![app("ALPHA", vec![]), app("BETA", vec![]), app("GAMMA", vec![])],
            ..Default::default()
        };

        let apps = projector(registry).find_all().await.unwrap();

        let names: Vec<_> = apps.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["ALPHA", "BETA", "GAMMA"]);
    }

    #[tokio::test]
    async fn test_find_all_projects_instance_fields() {
        let rec = InstanceRecord::new("APP", "10.0.0.1", "http://10.0.0.1:9000/status", InstanceStatus::Starting);
        let registry = MockRegistry {
            apps: vec![app("APP", vec![rec])],
            ..Default::default()
        };

        let apps = projector(registry).find_all().await.unwrap();
        let instance = &apps[0].instances[0];

        assert_eq!(instance.id.as_str(), "APP_10_0_0_1");
        assert_eq!(instance.name, "10.0.0.1");
        assert_eq!(instance.url, "http://10.0.0.1:9000");
        assert_eq!(instance.status, InstanceStatus::Starting);
    }

    #[tokio::test]
    async fn test_find_all_empty_registry() {
        let apps = projector(MockRegistry::default()).find_all().await.unwrap();
        assert!(apps.is_empty());
    }

    #[tokio::test]
    async fn test_find_all_malformed_status_page_is_fault() {
        let bad = InstanceRecord::new("APP", "h", "garbage", InstanceStatus::Up);
        let registry = MockRegistry {
            apps: vec![app("APP", vec![bad])],
            ..Default::default()
        };

        let result = projector(registry).find_all().await;
        assert!(matches!(
            result,
            Err(RepositoryError::MalformedManagementAddress { .. })
        ));
    }

    // ===== find_by_name Tests =====

    #[tokio::test]
    async fn test_find_by_name_found() {
        let registry = MockRegistry {
            apps: vec![app("APP1", vec![record("APP1", "10.0.0.1")]), app("APP2", vec![])],
            ..Default::default()
        };

        let found = projector(registry).find_by_name("APP1").await.unwrap().unwrap();
        assert_eq!(found.name, "APP1");
        assert_eq!(found.instances.len(), 1);
    }

    #[tokio::test]
    async fn test_find_by_name_unknown_is_none() {
        let found = projector(MockRegistry::default())
            .find_by_name("NOPE")
            .await
            .unwrap();
        assert!(found.is_none());
    }

    // ===== find_instance Tests =====

    #[tokio::test]
    async fn test_find_instance_by_encoded_id() {
        let registry = MockRegistry {
            apps: vec![app("APP", vec![record("APP", "10.0.0.1"), record("APP", "10.0.0.2")])],
            ..Default::default()
        };

        let id = InstanceId::encode("APP", "10.0.0.2");
        let instance = projector(registry).find_instance(&id).await.unwrap().unwrap();
        assert_eq!(instance.name, "10.0.0.2");
        assert_eq!(instance.id, id);
    }

    #[tokio::test]
    async fn test_find_instance_ghost_is_none() {
        let registry = MockRegistry {
            apps: vec![app("APP", vec![record("APP", "10.0.0.1")])],
            ..Default::default()
        };

        let found = projector(registry)
            .find_instance(&InstanceId::from("ghost"))
            .await
            .unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_find_instance_stale_id_is_none() {
        let registry = MockRegistry {
            apps: vec![app("APP", vec![record("APP", "10.0.0.1")])],
            ..Default::default()
        };

        let stale = InstanceId::encode("APP", "10.0.0.9");
        assert!(projector(registry).find_instance(&stale).await.unwrap().is_none());
    }

    // ===== Management URL Tests =====

    #[tokio::test]
    async fn test_instance_management_url_with_metadata() {
        let rec = record("APP", "10.0.0.1").with_metadata("managementPath", "/admin");
        let registry = MockRegistry {
            apps: vec![app("APP", vec![rec])],
            ..Default::default()
        };

        let url = projector(registry)
            .instance_management_url(&InstanceId::encode("APP", "10.0.0.1"))
            .await
            .unwrap();
        assert_eq!(url.as_deref(), Some("http://10.0.0.1:8080/admin"));
    }

    #[tokio::test]
    async fn test_instance_management_url_unknown() {
        let url = projector(MockRegistry::default())
            .instance_management_url(&InstanceId::encode("APP", "10.0.0.1"))
            .await
            .unwrap();
        assert!(url.is_none());
    }

    // ===== Circuit Breaker Tests =====

    #[tokio::test]
    async fn test_application_stream_url() {
        let registry = MockRegistry {
            apps: vec![app("APP", vec![])],
            ..Default::default()
        };
        let p = projector(registry);

        assert_eq!(
            p.application_circuit_breaker_stream_url("APP").await.unwrap().as_deref(),
            Some("http://localhost:8080/turbine.stream?cluster=APP")
        );
        assert!(p
            .application_circuit_breaker_stream_url("OTHER")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_instance_stream_url() {
        let registry = MockRegistry {
            apps: vec![app("APP", vec![record("APP", "10.0.0.1")])],
            ..Default::default()
        };
        let p = projector(registry);

        assert_eq!(
            p.instance_circuit_breaker_stream_url(&InstanceId::encode("APP", "10.0.0.1"))
                .await
                .unwrap()
                .as_deref(),
            Some("http://10.0.0.1:8080/hystrix.stream")
        );
        assert!(p
            .instance_circuit_breaker_stream_url(&InstanceId::from("APP_1_1_1_1"))
            .await
            .unwrap()
            .is_none());
    }

    // ===== History Tests =====

    #[tokio::test]
    async fn test_history_preserves_source_order() {
        let registry = MockRegistry {
            canceled: vec![event(3_000, "APP(c)"), event(1_000, "APP(a)")],
            registered: vec![event(2_000, "APP(b)")],
            ..Default::default()
        };
        let p = projector(registry);

        let canceled = p.canceled_history().await;
        assert_eq!(canceled.len(), 2);
        assert_eq!(canceled[0].instance, "APP(c)");
        assert_eq!(canceled[1].instance, "APP(a)");

        let registered = p.registered_history().await;
        assert_eq!(registered.len(), 1);
        assert_eq!(registered[0].timestamp.timestamp_millis(), 2_000);
    }

    #[tokio::test]
    async fn test_history_requests_configured_window() {
        let registry = Arc::new(MockRegistry::default());
        let p = RegistryProjector::new(registry.clone(), String::new(), 7);

        p.canceled_history().await;
        assert_eq!(*registry.requested_window.lock().unwrap(), Some(7));
    }
}
