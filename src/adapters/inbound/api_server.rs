//! Dashboard API Server
//!
//! HTTP API exposing the registry snapshot and relaying management calls
//! to registered instances. Also accepts registrations, heartbeats and
//! cancellations that feed the in-memory registry.

use crate::adapters::outbound::InMemoryRegistry;
use crate::application::{RelayOutcome, RelayService};
use crate::domain::entities::{Application, InstanceRecord};
use crate::domain::errors::{RegistrationError, RepositoryError};
use crate::domain::ports::ApplicationRepository;
use crate::domain::value_objects::{InstanceId, InstanceStatus, ManagementPath, ManagementPathError};
use crate::infrastructure::shutdown::ShutdownController;
use axum::{
    extract::{Path, Query, State},
    http::{header::CONTENT_TYPE, HeaderMap, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Registration request from an instance.
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterRequest {
    pub address: String,
    pub status_page_url: String,
    #[serde(default = "default_status")]
    pub status: InstanceStatus,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

fn default_status() -> InstanceStatus {
    InstanceStatus::Up
}

/// Registration response.
#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub id: InstanceId,
    pub registered: bool,
}

/// Health response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub applications: usize,
    pub instances: usize,
}

/// Circuit-breaker stream location.
#[derive(Debug, Serialize)]
pub struct StreamUrlResponse {
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub name: Option<String>,
}

#[derive(Debug, Serialize)]
struct ApiErrorResponse {
    error: String,
}

/// Failures surfaced by the handlers.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error("invalid management path: {0}")]
    InvalidPath(#[from] ManagementPathError),
    #[error("registration rejected: {0}")]
    Registration(#[from] RegistrationError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::Repository(e) => {
                tracing::error!("registry data fault: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                )
            }
            ApiError::InvalidPath(_) | ApiError::Registration(_) => {
                (StatusCode::BAD_REQUEST, self.to_string())
            }
        };

        (status, Json(ApiErrorResponse { error: message })).into_response()
    }
}

/// API Server state.
#[derive(Clone)]
pub struct ApiState {
    /// Read side: projected view of the registry
    pub repository: Arc<dyn ApplicationRepository>,
    pub relay: Arc<RelayService>,
    /// Write side: registrations and lease renewals
    pub registry: InMemoryRegistry,
}

/// Build the API router.
pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        // Registry snapshot
        .route("/api/applications", get(list_applications_handler))
        .route("/api/instance/:id", get(get_instance_handler))
        // Management relay
        .route("/api/instance/:id/*path", get(relay_handler).post(relay_handler))
        // History
        .route("/api/registry/history/canceled", get(canceled_history_handler))
        .route("/api/registry/history/registered", get(registered_history_handler))
        // Circuit-breaker streams
        .route(
            "/api/circuit-breaker/application/:name",
            get(application_stream_handler),
        )
        .route("/api/circuit-breaker/instance/:id", get(instance_stream_handler))
        // Registration
        .route("/api/registry/apps/:app", post(register_handler))
        .route(
            "/api/registry/apps/:app/:address",
            put(heartbeat_handler).delete(cancel_handler),
        )
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

/// Dashboard HTTP server.
pub struct ApiServer {
    listen_addr: String,
    state: ApiState,
    /// Upper bound on waiting for in-flight relays once shutdown starts
    drain_timeout: Duration,
}

impl ApiServer {
    pub fn new(listen_addr: String, state: ApiState, drain_timeout: Duration) -> Self {
        Self {
            listen_addr,
            state,
            drain_timeout,
        }
    }

    /// Run until `shutdown` is triggered.
    ///
    /// Once shutdown starts, in-flight relays get at most `drain_timeout`
    /// to finish. Connections still open after that are dropped.
    #[cfg_attr(coverage_nightly, coverage(off))]
    pub async fn run(&self, shutdown: ShutdownController) -> anyhow::Result<()> {
        let app = router(self.state.clone());

        let listener = TcpListener::bind(&self.listen_addr).await?;
        tracing::info!("dashboard API listening on {}", self.listen_addr);

        let signal = shutdown.clone();
        let serve = axum::serve(listener, app)
            .with_graceful_shutdown(async move { signal.wait_for_shutdown().await });

        let drained = async {
            shutdown.wait_for_shutdown().await;
            shutdown.wait_for_drain(self.drain_timeout).await
        };

        tokio::select! {
            result = serve => result?,
            complete = drained => {
                if !complete {
                    tracing::warn!(
                        "dropping {} relays still in flight after {:?}",
                        shutdown.in_flight(),
                        self.drain_timeout
                    );
                }
            }
        }
        Ok(())
    }
}

// Handler functions

async fn health_handler(State(state): State<ApiState>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        applications: state.registry.application_count(),
        instances: state.registry.instance_count(),
    })
}

async fn list_applications_handler(
    State(state): State<ApiState>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<Application>>, ApiError> {
    tracing::debug!("deliver applications with name={:?}", params.name);
    let apps = match params.name.as_deref() {
        None | Some("") => state.repository.find_all().await?,
        Some(name) => state.repository.find_by_name(name).await?.into_iter().collect(),
    };
    Ok(Json(apps))
}

async fn get_instance_handler(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    tracing::debug!("deliver instance with id {}", id);
    let instance = state.repository.find_instance(&InstanceId::from(id)).await?;
    Ok(match instance {
        Some(instance) => Json(instance).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    })
}

async fn relay_handler(
    State(state): State<ApiState>,
    Path((id, path)): Path<(String, String)>,
    method: Method,
    headers: HeaderMap,
    body: String,
) -> Result<Response, ApiError> {
    let path = ManagementPath::parse(&path)?;
    let id = InstanceId::from(id);

    let outcome = state
        .relay
        .relay(&id, &path, method, &headers, Some(body))
        .await?;

    Ok(match outcome {
        RelayOutcome::Relayed(upstream) => {
            let mut response = (upstream.status, upstream.body).into_response();
            match upstream.content_type.as_deref().map(HeaderValue::from_str) {
                Some(Ok(value)) => {
                    response.headers_mut().insert(CONTENT_TYPE, value);
                }
                Some(Err(_)) | None => {
                    response.headers_mut().remove(CONTENT_TYPE);
                }
            }
            response
        }
        RelayOutcome::NotFound => StatusCode::NOT_FOUND.into_response(),
        RelayOutcome::UpstreamError => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    })
}

async fn canceled_history_handler(State(state): State<ApiState>) -> impl IntoResponse {
    Json(state.repository.canceled_history().await)
}

async fn registered_history_handler(State(state): State<ApiState>) -> impl IntoResponse {
    Json(state.repository.registered_history().await)
}

async fn application_stream_handler(
    State(state): State<ApiState>,
    Path(name): Path<String>,
) -> Result<Response, ApiError> {
    let url = state
        .repository
        .application_circuit_breaker_stream_url(&name)
        .await?;
    Ok(stream_url_response(url))
}

async fn instance_stream_handler(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let url = state
        .repository
        .instance_circuit_breaker_stream_url(&InstanceId::from(id))
        .await?;
    Ok(stream_url_response(url))
}

fn stream_url_response(url: Option<String>) -> Response {
    match url {
        Some(url) => Json(StreamUrlResponse { url }).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn register_handler(
    State(state): State<ApiState>,
    Path(app): Path<String>,
    Json(req): Json<RegisterRequest>,
) -> Result<Response, ApiError> {
    let mut record = InstanceRecord::new(&app, &req.address, &req.status_page_url, req.status);
    record.metadata = req.metadata;
    let id = record.instance_id();

    state.registry.register(record)?;
    tracing::info!("registered instance {}", id);

    let response = RegisterResponse {
        id,
        registered: true,
    };
    Ok((StatusCode::CREATED, Json(response)).into_response())
}

async fn heartbeat_handler(
    State(state): State<ApiState>,
    Path((app, address)): Path<(String, String)>,
) -> impl IntoResponse {
    if state.registry.renew(&app, &address) {
        tracing::debug!("heartbeat from {}({})", app, address);
        (
            StatusCode::OK,
            Json(serde_json::json!({
                "app": app,
                "address": address,
                "status": "ok"
            })),
        )
    } else {
        (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({
                "app": app,
                "address": address,
                "error": "instance not registered"
            })),
        )
    }
}

async fn cancel_handler(
    State(state): State<ApiState>,
    Path((app, address)): Path<(String, String)>,
) -> impl IntoResponse {
    if state.registry.cancel(&app, &address) {
        tracing::info!("cancelled instance {}({})", app, address);
        (
            StatusCode::OK,
            Json(serde_json::json!({
                "app": app,
                "address": address,
                "cancelled": true
            })),
        )
    } else {
        (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({
                "app": app,
                "address": address,
                "error": "instance not found"
            })),
        )
    }
}
