//! Management URL Resolver
//!
//! Pure domain logic for locating an instance's management endpoint.
//! No I/O; everything is derived from the registry record.

use crate::domain::entities::{InstanceRecord, MANAGEMENT_PATH_KEY};
use crate::domain::errors::RepositoryError;

/// Derives base URLs from self-reported status page URLs.
pub struct ManagementUrlResolver;

impl ManagementUrlResolver {
    /// Status page URL with its last path segment removed.
    ///
    /// Everything from the last `/` onward is dropped, so
    /// `http://host:8080/info` becomes `http://host:8080`.
    ///
    /// # Example
    /// ```
    /// use registry_dashboard::domain::services::ManagementUrlResolver;
    ///
    /// let base = ManagementUrlResolver::status_page_base("APP", "http://host:8080/info").unwrap();
    /// assert_eq!(base, "http://host:8080");
    /// ```
    pub fn status_page_base(instance: &str, status_page_url: &str) -> Result<String, RepositoryError> {
        match status_page_url.rfind('/') {
            Some(idx) => Ok(status_page_url[..idx].to_string()),
            None => Err(RepositoryError::MalformedManagementAddress {
                instance: instance.to_string(),
                url: status_page_url.to_string(),
            }),
        }
    }

    /// Base management URL for an instance.
    ///
    /// The status page base, followed verbatim by the `managementPath`
    /// metadata entry when the instance advertises one.
    pub fn resolve(record: &InstanceRecord) -> Result<String, RepositoryError> {
        let mut url = Self::status_page_base(record.instance_id().as_str(), &record.status_page_url)?;
        if let Some(path) = record.metadata.get(MANAGEMENT_PATH_KEY) {
            url.push_str(path);
        }
        Ok(url)
    }
}
