//! Domain Entities - Core business objects
//!
//! Two families live here: the records a registry hands us
//! ([`InstanceRecord`], [`RegistryApplication`], [`HistoryEvent`]) and the
//! public view model projected from them ([`Application`], [`Instance`],
//! [`InstanceHistory`]). View objects are rebuilt on every query.

use crate::domain::value_objects::{InstanceId, InstanceStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Metadata key an instance uses to point at a non-default management path.
pub const MANAGEMENT_PATH_KEY: &str = "managementPath";

/// A single instance as the registry stores it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceRecord {
    /// Owning application name (case-sensitive)
    pub app: String,
    /// Network address the instance registered under (IP or hostname)
    pub address: String,
    /// Self-reported status page, e.g. `http://10.0.0.1:8080/info`
    pub status_page_url: String,
    pub status: InstanceStatus,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl InstanceRecord {
    pub fn new(app: &str, address: &str, status_page_url: &str, status: InstanceStatus) -> Self {
        Self {
            app: app.to_string(),
            address: address.to_string(),
            status_page_url: status_page_url.to_string(),
            status,
            metadata: HashMap::new(),
        }
    }

    /// Builder-style metadata insertion.
    pub fn with_metadata(mut self, key: &str, value: &str) -> Self {
        self.metadata.insert(key.to_string(), value.to_string());
        self
    }

    /// Identifier of this instance in the public view model.
    pub fn instance_id(&self) -> InstanceId {
        InstanceId::encode(&self.app, &self.address)
    }
}

/// An application as the registry stores it.
#[derive(Debug, Clone, PartialEq)]
pub struct RegistryApplication {
    pub name: String,
    pub instances: Vec<InstanceRecord>,
}

/// Entry of one of the registry's bounded history buffers.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEvent {
    pub timestamp: DateTime<Utc>,
    /// `APP(address)`
    pub description: String,
}

impl HistoryEvent {
    pub fn for_instance(record: &InstanceRecord, timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            description: format!("{}({})", record.app, record.address),
        }
    }
}

/// Public view of an application.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Application {
    pub name: String,
    /// Sorted by instance name
    pub instances: Vec<Instance>,
}

/// Public view of an instance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Instance {
    pub id: InstanceId,
    /// Registry-native instance address
    pub name: String,
    /// Status page URL without its last path segment
    pub url: String,
    pub status: InstanceStatus,
}

/// Public view of a registration or cancellation event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InstanceHistory {
    pub instance: String,
    pub timestamp: DateTime<Utc>,
}

impl From<HistoryEvent> for InstanceHistory {
    fn from(event: HistoryEvent) -> Self {
        Self {
            instance: event.description,
            timestamp: event.timestamp,
        }
    }
}
