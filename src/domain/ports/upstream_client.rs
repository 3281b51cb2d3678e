//! Upstream Client Port
//!
//! Outbound HTTP used by the relay. Implementations are shared between
//! concurrent relays and must pool their connections.

use crate::domain::errors::TransportError;
use async_trait::async_trait;
use http::{HeaderMap, Method, StatusCode};

/// Request to issue against an instance's management endpoint.
#[derive(Debug, Clone)]
pub struct UpstreamRequest {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    /// Sent as the request entity when present
    pub body: Option<String>,
}

/// What the instance answered, passed through untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub content_type: Option<String>,
    pub body: String,
}

#[async_trait]
pub trait UpstreamClient: Send + Sync {
    /// Issue a request. Any non-transport outcome, including 4xx and 5xx,
    /// is an `Ok` response.
    async fn execute(&self, request: UpstreamRequest) -> Result<UpstreamResponse, TransportError>;
}
