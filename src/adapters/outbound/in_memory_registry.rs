//! In-Memory Registry
//!
//! Implements RegistrySource with a DashMap of leases fed by the
//! registration API. Instances that stop renewing are evicted.

use crate::domain::entities::{HistoryEvent, InstanceRecord, RegistryApplication};
use crate::domain::errors::RegistrationError;
use crate::domain::ports::RegistrySource;
use crate::domain::value_objects::ID_SEPARATOR;
use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A registered instance and its lease bookkeeping.
#[derive(Debug, Clone)]
struct Lease {
    record: InstanceRecord,
    last_renewal: Instant,
}

/// Fixed-capacity event log; the oldest entry is dropped when full.
#[derive(Debug)]
struct HistoryRing {
    events: Mutex<VecDeque<HistoryEvent>>,
    capacity: usize,
}

impl HistoryRing {
    fn new(capacity: usize) -> Self {
        Self {
            events: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    fn push(&self, event: HistoryEvent) {
        if self.capacity == 0 {
            return;
        }
        let mut events = self.events.lock();
        if events.len() == self.capacity {
            events.pop_front();
        }
        events.push_back(event);
    }

    /// Newest first.
    fn last(&self, n: usize) -> Vec<HistoryEvent> {
        self.events.lock().iter().rev().take(n).cloned().collect()
    }
}

/// DashMap-backed service registry.
///
/// Applications map to their instances keyed by address. Cloning shares
/// the underlying state, so the eviction task and the API see the same
/// registry.
#[derive(Clone)]
pub struct InMemoryRegistry {
    apps: Arc<DashMap<String, HashMap<String, Lease>>>,
    registered: Arc<HistoryRing>,
    canceled: Arc<HistoryRing>,
    lease_ttl: Duration,
}

impl InMemoryRegistry {
    /// Create a registry keeping `history_capacity` events per history
    /// buffer and expiring leases not renewed within `lease_ttl`.
    pub fn new(history_capacity: usize, lease_ttl: Duration) -> Self {
        Self {
            apps: Arc::new(DashMap::new()),
            registered: Arc::new(HistoryRing::new(history_capacity)),
            canceled: Arc::new(HistoryRing::new(history_capacity)),
            lease_ttl,
        }
    }

    /// Register an instance, replacing any existing registration for the
    /// same application and address.
    ///
    /// Application names must not contain the identifier separator, since
    /// the instance id could not be decoded back to them.
    pub fn register(&self, record: InstanceRecord) -> Result<(), RegistrationError> {
        if record.app.is_empty() {
            return Err(RegistrationError::MissingField("app"));
        }
        if record.address.is_empty() {
            return Err(RegistrationError::MissingField("address"));
        }
        if record.app.contains(ID_SEPARATOR) {
            return Err(RegistrationError::ReservedCharacter(ID_SEPARATOR));
        }

        let event = HistoryEvent::for_instance(&record, Utc::now());
        let lease = Lease {
            record,
            last_renewal: Instant::now(),
        };

        self.apps
            .entry(lease.record.app.clone())
            .or_default()
            .insert(lease.record.address.clone(), lease);
        self.registered.push(event);

        Ok(())
    }

    /// Renew the lease of an instance. Returns false if it is not registered.
    pub fn renew(&self, app: &str, address: &str) -> bool {
        match self.apps.get_mut(app) {
            Some(mut instances) => match instances.get_mut(address) {
                Some(lease) => {
                    lease.last_renewal = Instant::now();
                    true
                }
                None => false,
            },
            None => false,
        }
    }

    /// Cancel a registration. Returns false if it was not registered.
    pub fn cancel(&self, app: &str, address: &str) -> bool {
        let removed = match self.apps.get_mut(app) {
            Some(mut instances) => instances.remove(address),
            None => None,
        };
        self.apps.remove_if(app, |_, instances| instances.is_empty());

        match removed {
            Some(lease) => {
                self.canceled
                    .push(HistoryEvent::for_instance(&lease.record, Utc::now()));
                true
            }
            None => false,
        }
    }

    /// Cancel every instance whose lease has expired.
    pub fn evict_expired(&self) -> usize {
        let now = Instant::now();
        let expired: Vec<(String, String)> = self
            .apps
            .iter()
            .flat_map(|entry| {
                entry
                    .value()
                    .values()
                    .filter(|lease| now.duration_since(lease.last_renewal) >= self.lease_ttl)
                    .map(|lease| (lease.record.app.clone(), lease.record.address.clone()))
                    .collect::<Vec<_>>()
            })
            .collect();

        let mut count = 0;
        for (app, address) in expired {
            if self.cancel(&app, &address) {
                tracing::info!("evicted expired instance {}({})", app, address);
                count += 1;
            }
        }
        count
    }

    /// Start the background eviction task.
    pub fn start_eviction(&self, interval: Duration) {
        let registry = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                let evicted = registry.evict_expired();
                if evicted > 0 {
                    tracing::debug!("eviction removed {} instances", evicted);
                }
            }
        });
    }

    pub fn application_count(&self) -> usize {
        self.apps.len()
    }

    pub fn instance_count(&self) -> usize {
        self.apps.iter().map(|entry| entry.value().len()).sum()
    }
}

#[async_trait]
impl RegistrySource for InMemoryRegistry {
    async fn all_applications(&self) -> Vec<RegistryApplication> {
        let mut apps: Vec<RegistryApplication> = self
            .apps
            .iter()
            .map(|entry| RegistryApplication {
                name: entry.key().clone(),
                instances: entry.value().values().map(|l| l.record.clone()).collect(),
            })
            .collect();
        apps.sort_by(|a, b| a.name.cmp(&b.name));
        apps
    }

    async fn application_by_name(&self, name: &str) -> Option<RegistryApplication> {
        self.apps.get(name).map(|entry| RegistryApplication {
            name: entry.key().clone(),
            instances: entry.value().values().map(|l| l.record.clone()).collect(),
        })
    }

    async fn instance_by_app_and_address(
        &self,
        app: &str,
        address: &str,
    ) -> Option<InstanceRecord> {
        self.apps
            .get(app)
            .and_then(|instances| instances.get(address).map(|l| l.record.clone()))
    }

    async fn last_canceled(&self, n: usize) -> Vec<HistoryEvent> {
        self.canceled.last(n)
    }

    async fn last_registered(&self, n: usize) -> Vec<HistoryEvent> {
        self.registered.last(n)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::domain::value_objects::InstanceStatus;

    fn record(app: &str, address: &str) -> InstanceRecord {
        InstanceRecord::new(
            app,
            address,
            &format!("http://{}:8080/info", address),
            InstanceStatus::Up,
        )
    }

    fn registry() -> InMemoryRegistry {
        InMemoryRegistry::new(10, Duration::from_secs(60))
    }

    // ===== Register Tests =====

    #[tokio::test]
    async fn test_register_and_lookup() {
        let reg = registry();
        reg.register(record("BILLING", "10.0.0.1")).unwrap();

        let found = reg.instance_by_app_and_address("BILLING", "10.0.0.1").await;
        assert_eq!(found.unwrap().address, "10.0.0.1");
        assert_eq!(reg.instance_count(), 1);
    }

    #[tokio::test]
    async fn test_register_replaces_existing() {
        let reg = registry();
        reg.register(record("BILLING", "10.0.0.1")).unwrap();

        let mut updated = record("BILLING", "10.0.0.1");
        updated.status = InstanceStatus::Down;
        reg.register(updated).unwrap();

        assert_eq!(reg.instance_count(), 1);
        let found = reg.instance_by_app_and_address("BILLING", "10.0.0.1").await.unwrap();
        assert_eq!(found.status, InstanceStatus::Down);
    }

    #[test]
    fn test_register_rejects_separator_in_app_name() {
        let reg = registry();
        let err = reg.register(record("my_app", "10.0.0.1")).unwrap_err();
        assert_eq!(err, RegistrationError::ReservedCharacter('_'));
        assert_eq!(reg.instance_count(), 0);
    }

    #[test]
    fn test_register_rejects_empty_fields() {
        let reg = registry();
        assert_eq!(
            reg.register(record("", "10.0.0.1")),
            Err(RegistrationError::MissingField("app"))
        );
        assert_eq!(
            reg.register(record("APP", "")),
            Err(RegistrationError::MissingField("address"))
        );
    }

    #[tokio::test]
    async fn test_lookup_is_case_sensitive() {
        let reg = registry();
        reg.register(record("Billing", "10.0.0.1")).unwrap();

        assert!(reg.application_by_name("BILLING").await.is_none());
        assert!(reg.application_by_name("Billing").await.is_some());
    }

    // ===== Listing Tests =====

    #[tokio::test]
    async fn test_all_applications_sorted_by_name() {
        let reg = registry();
        reg.register(record("ZULU", "10.0.0.3")).unwrap();
        reg.register(record("ALPHA", "10.0.0.1")).unwrap();
        reg.register(record("MIKE", "10.0.0.2")).unwrap();
        reg.register(record("ALPHA", "10.0.0.4")).unwrap();

        let apps = reg.all_applications().await;
        let names: Vec<_> = apps.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["ALPHA", "MIKE", "ZULU"]);
        assert_eq!(apps[0].instances.len(), 2);
    }

    // ===== Renew Tests =====

    #[test]
    fn test_renew() {
        let reg = registry();
        reg.register(record("APP", "10.0.0.1")).unwrap();

        assert!(reg.renew("APP", "10.0.0.1"));
        assert!(!reg.renew("APP", "10.0.0.2"));
        assert!(!reg.renew("OTHER", "10.0.0.1"));
    }

    // ===== Cancel Tests =====

    #[tokio::test]
    async fn test_cancel_removes_instance_and_empty_app() {
        let reg = registry();
        reg.register(record("APP", "10.0.0.1")).unwrap();

        assert!(reg.cancel("APP", "10.0.0.1"));
        assert!(!reg.cancel("APP", "10.0.0.1"));
        assert_eq!(reg.application_count(), 0);
        assert!(reg.application_by_name("APP").await.is_none());
    }

    #[tokio::test]
    async fn test_cancel_keeps_app_with_remaining_instances() {
        let reg = registry();
        reg.register(record("APP", "10.0.0.1")).unwrap();
        reg.register(record("APP", "10.0.0.2")).unwrap();

        assert!(reg.cancel("APP", "10.0.0.1"));
        let app = reg.application_by_name("APP").await.unwrap();
        assert_eq!(app.instances.len(), 1);
    }

    // ===== History Tests =====

    #[tokio::test]
    async fn test_history_newest_first() {
        let reg = registry();
        reg.register(record("APP", "10.0.0.1")).unwrap();
        reg.register(record("APP", "10.0.0.2")).unwrap();
        reg.cancel("APP", "10.0.0.1");

        let registered = reg.last_registered(10).await;
        assert_eq!(registered.len(), 2);
        assert_eq!(registered[0].description, "APP(10.0.0.2)");
        assert_eq!(registered[1].description, "APP(10.0.0.1)");

        let canceled = reg.last_canceled(10).await;
        assert_eq!(canceled.len(), 1);
        assert_eq!(canceled[0].description, "APP(10.0.0.1)");
    }

    #[tokio::test]
    async fn test_history_is_bounded() {
        let reg = InMemoryRegistry::new(3, Duration::from_secs(60));
        for i in 0..5 {
            reg.register(record("APP", &format!("10.0.0.{}", i))).unwrap();
        }

        let registered = reg.last_registered(100).await;
        assert_eq!(registered.len(), 3);
        assert_eq!(registered[0].description, "APP(10.0.0.4)");
        assert_eq!(registered[2].description, "APP(10.0.0.2)");
    }

    #[tokio::test]
    async fn test_history_window_limits_result() {
        let reg = registry();
        for i in 0..5 {
            reg.register(record("APP", &format!("10.0.0.{}", i))).unwrap();
        }
        assert_eq!(reg.last_registered(2).await.len(), 2);
    }

    #[tokio::test]
    async fn test_zero_capacity_history_keeps_nothing() {
        let reg = InMemoryRegistry::new(0, Duration::from_secs(60));
        reg.register(record("APP", "10.0.0.1")).unwrap();
        assert!(reg.last_registered(10).await.is_empty());
    }

    // ===== Eviction Tests =====

    #[tokio::test]
    async fn test_evict_expired_records_cancellation() {
        let reg = InMemoryRegistry::new(10, Duration::ZERO);
        reg.register(record("APP", "10.0.0.1")).unwrap();

        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(reg.evict_expired(), 1);
        assert_eq!(reg.instance_count(), 0);
        assert_eq!(reg.last_canceled(10).await.len(), 1);
    }

    #[test]
    fn test_evict_keeps_fresh_leases() {
        let reg = InMemoryRegistry::new(10, Duration::from_secs(3600));
        reg.register(record("APP", "10.0.0.1")).unwrap();

        assert_eq!(reg.evict_expired(), 0);
        assert_eq!(reg.instance_count(), 1);
    }

    #[tokio::test]
    async fn test_start_eviction_removes_expired() {
        let reg = InMemoryRegistry::new(10, Duration::ZERO);
        reg.register(record("APP", "10.0.0.1")).unwrap();

        reg.start_eviction(Duration::from_millis(10));
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(reg.instance_count(), 0);
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let reg = registry();
        let other = reg.clone();
        reg.register(record("APP", "10.0.0.1")).unwrap();

        assert!(other.instance_by_app_and_address("APP", "10.0.0.1").await.is_some());
    }
}
