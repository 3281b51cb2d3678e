//! Registry Dashboard - service registry dashboard with hexagonal architecture
//!
//! This is the composition root that wires together all the components.

use registry_dashboard::adapters::inbound::{ApiServer, ApiState};
use registry_dashboard::adapters::outbound::{
    InMemoryRegistry, ReqwestUpstreamClient, UpstreamClientConfig,
};
use registry_dashboard::application::{RegistryProjector, RelayService};
use registry_dashboard::config::load_config;
use registry_dashboard::domain::ports::ApplicationRepository;
use registry_dashboard::infrastructure::{shutdown_signal, ShutdownController};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::fmt::format::FmtSpan;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration from environment
    let cfg = load_config()?;

    // Setup logging
    let log_level = if cfg.debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_span_events(FmtSpan::CLOSE)
        .init();

    tracing::info!(
        "starting registry dashboard listen={} turbine={}",
        cfg.listen_addr,
        cfg.turbine_url
    );

    // ===== COMPOSITION ROOT =====

    // 1. Outbound adapters
    let registry = InMemoryRegistry::new(
        cfg.history_size,
        Duration::from_secs(cfg.lease_ttl_secs),
    );
    registry.start_eviction(Duration::from_secs(cfg.eviction_interval_secs));

    let client = Arc::new(ReqwestUpstreamClient::new(&UpstreamClientConfig {
        connect_timeout: Duration::from_millis(cfg.proxy_connect_timeout_ms),
        request_timeout: Duration::from_secs(cfg.proxy_timeout_secs),
    })?);

    // 2. Application services
    let repository: Arc<dyn ApplicationRepository> = Arc::new(RegistryProjector::new(
        Arc::new(registry.clone()),
        cfg.turbine_url.clone(),
        cfg.history_size,
    ));

    let shutdown = ShutdownController::new();
    let relay = Arc::new(RelayService::new(
        repository.clone(),
        client,
        shutdown.clone(),
    ));

    // 3. Inbound adapter
    let state = ApiState {
        repository,
        relay,
        registry,
    };
    let server = ApiServer::new(
        cfg.listen_addr.clone(),
        state,
        Duration::from_secs(cfg.drain_timeout_secs),
    );

    tokio::spawn(shutdown_signal(shutdown.clone()));
    server.run(shutdown).await?;

    tracing::info!("registry dashboard stopped");
    Ok(())
}
