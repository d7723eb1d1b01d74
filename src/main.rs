//! metrics-gateway - Prometheus exporter gateway with Hexagonal Architecture
//!
//! This is the composition root that wires together all the components.

use metrics_gateway::adapters::inbound::{ApiServer, ApiState};
use metrics_gateway::adapters::outbound::{
    ElasticsearchProvisioner, KubeApiClient, PostgresProvisioner,
};
use metrics_gateway::config::load_config;
use metrics_gateway::infrastructure::{shutdown_signal, ShutdownController};
use metrics_gateway::{CollectorCache, ProvisionerRegistry, RequestDispatcher};
use std::sync::Arc;
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
        "starting metrics-gateway listen={} kube_api={}",
        cfg.listen_addr,
        cfg.kube_api_url
    );

    // ===== COMPOSITION ROOT =====

    // 1. Outbound adapters: one Kubernetes client serves resources and secrets
    let kube = Arc::new(KubeApiClient::from_config(&cfg.kube_api())?);

    // 2. Provisioners, keyed by backend kind
    let registry = ProvisionerRegistry::new()
        .register(Arc::new(PostgresProvisioner::new(
            kube.clone(),
            kube.clone(),
            cfg.postgres_timeout(),
        )))
        .register(Arc::new(ElasticsearchProvisioner::new(kube)));

    // 3. Application services around the shared cache
    let cache = Arc::new(CollectorCache::new());
    let dispatcher = Arc::new(RequestDispatcher::new(registry, cache.clone()));

    // 4. Inbound adapter
    let server = ApiServer::new(cfg.listen_addr.clone(), ApiState::new(dispatcher, cache));

    let shutdown = ShutdownController::new();
    tokio::spawn(shutdown_signal(shutdown.clone()));

    server.run(shutdown).await
}
