//! Relay Service - management proxy use case
//!
//! Forwards a caller's request to the management endpoint of a registered
//! instance and hands back whatever the instance answered:
//! 1. Resolve the instance id to its management URL
//! 2. Issue the request against `<management url>/<sub-path>`
//! 3. Pass the upstream status and body through, or report the failure

use crate::domain::errors::RepositoryError;
use crate::domain::ports::{ApplicationRepository, UpstreamClient, UpstreamRequest, UpstreamResponse};
use crate::domain::value_objects::{InstanceId, ManagementPath};
use crate::infrastructure::headers::forwardable_headers;
use crate::infrastructure::shutdown::ShutdownController;
use http::{HeaderMap, Method};
use std::sync::Arc;

/// Result of a relay attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum RelayOutcome {
    /// The instance answered; status and body are untouched.
    Relayed(UpstreamResponse),
    /// The id does not resolve against the current registry. No request
    /// was sent.
    NotFound,
    /// The request failed at the network level.
    UpstreamError,
}

pub struct RelayService {
    repository: Arc<dyn ApplicationRepository>,
    client: Arc<dyn UpstreamClient>,
    shutdown: ShutdownController,
}

impl RelayService {
    pub fn new(
        repository: Arc<dyn ApplicationRepository>,
        client: Arc<dyn UpstreamClient>,
        shutdown: ShutdownController,
    ) -> Self {
        Self {
            repository,
            client,
            shutdown,
        }
    }

    /// Relay one request to an instance.
    ///
    /// GET and HEAD requests never carry a body. For other methods `body`
    /// is sent verbatim. There are no retries; a failure is reported once.
    ///
    /// # Errors
    /// Only [`RepositoryError`] faults, i.e. registry data we cannot
    /// derive a management URL from.
    pub async fn relay(
        &self,
        id: &InstanceId,
        path: &ManagementPath,
        method: Method,
        headers: &HeaderMap,
        body: Option<String>,
    ) -> Result<RelayOutcome, RepositoryError> {
        let Some(management_url) = self.repository.instance_management_url(id).await? else {
            tracing::debug!("relay target {} not registered", id);
            return Ok(RelayOutcome::NotFound);
        };

        let url = format!("{}/{}", management_url, path);
        let body = match method {
            Method::GET | Method::HEAD => None,
            _ => body,
        };
        let request = UpstreamRequest {
            method,
            url,
            headers: forwardable_headers(headers),
            body,
        };

        let _guard = self.shutdown.relay_guard();
        tracing::debug!("relaying {} {} for {}", request.method, request.url, id);

        match self.client.execute(request).await {
            Ok(response) => Ok(RelayOutcome::Relayed(response)),
            Err(e) => {
                tracing::warn!("cannot relay to instance {}: {}", id, e);
                Ok(RelayOutcome::UpstreamError)
            }
        }
    }
}
