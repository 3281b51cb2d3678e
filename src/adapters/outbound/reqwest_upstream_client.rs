//! Reqwest Upstream Client
//!
//! Implements UpstreamClient with a single pooled reqwest client shared by
//! every relay.

use crate::domain::errors::TransportError;
use crate::domain::ports::{UpstreamClient, UpstreamRequest, UpstreamResponse};
use async_trait::async_trait;
use http::header::CONTENT_TYPE;
use std::time::Duration;

/// Timeouts applied to every relayed request.
#[derive(Debug, Clone)]
pub struct UpstreamClientConfig {
    pub connect_timeout: Duration,
    /// Covers the whole exchange, body included
    pub request_timeout: Duration,
}

impl Default for UpstreamClientConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(2),
            request_timeout: Duration::from_secs(30),
        }
    }
}

pub struct ReqwestUpstreamClient {
    client: reqwest::Client,
}

impl ReqwestUpstreamClient {
    pub fn new(config: &UpstreamClientConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl UpstreamClient for ReqwestUpstreamClient {
    async fn execute(&self, request: UpstreamRequest) -> Result<UpstreamResponse, TransportError> {
        let mut builder = self
            .client
            .request(request.method, &request.url)
            .headers(request.headers);
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| TransportError(format!("request to {} failed: {}", request.url, e)))?;

        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response
            .text()
            .await
            .map_err(|e| TransportError(format!("reading body from {} failed: {}", request.url, e)))?;

        Ok(UpstreamResponse {
            status,
            content_type,
            body,
        })
    }
}
