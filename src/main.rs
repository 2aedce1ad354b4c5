// Main entry point - Dependency injection and server setup
mod application;
mod domain;
mod infrastructure;
mod presentation;

use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use crate::application::chart_registry::ChartRegistry;
use crate::application::chart_store::ChartStore;
use crate::application::effects::{run_dispatcher, EffectSender};
use crate::application::engine::{Clock, Engine, EngineState, SystemClock};
use crate::application::heartbeat::spawn_heartbeat;
use crate::application::ingestion::IngestionPipeline;
use crate::application::subscription::{DetachedSource, SubscriptionClient};
use crate::application::workspace_service::WorkspaceService;
use crate::domain::workspace::DEFAULT_WORKSPACE_ID;
use crate::infrastructure::config::{load_config, SourceKind};
use crate::infrastructure::gateway_client::GatewayClient;
use crate::infrastructure::json_store::JsonFileStore;
use crate::infrastructure::simulation::{simulated_nodes, SimulatedSource};
use crate::presentation::app_state::AppState;
use crate::presentation::router::router;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = load_config().context("Failed to load configuration")?;
    let bucket = config.engine.bucket();
    let bucket_ms = bucket.as_millis() as u64;

    // Store and effects (infrastructure + application layers)
    let store: Arc<dyn ChartStore> = Arc::new(JsonFileStore::new(&config.store.path));
    let (effects, effect_rx) = EffectSender::channel();

    // Engine owns the point buffer and the chart registry
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let state = EngineState::new(
        IngestionPipeline::new(bucket_ms as i64, config.engine.retention()),
        ChartRegistry::new(effects, bucket_ms),
    );
    let (engine, _engine_task) = Engine::spawn(state, clock.clone(), config.engine.command_queue);

    let source: Arc<dyn SubscriptionClient> = match config.source.kind {
        SourceKind::Simulation => Arc::new(SimulatedSource::new(engine.clone(), clock)),
        SourceKind::Gateway => {
            let url = config
                .source
                .gateway_url
                .as_deref()
                .context("source.gateway_url is required for the gateway source")?;
            Arc::new(GatewayClient::new(url))
        }
        SourceKind::None => Arc::new(DetachedSource),
    };
    let nodes = match config.source.kind {
        SourceKind::Simulation => simulated_nodes(),
        _ => Vec::new(),
    };
    tracing::info!(source = ?config.source.kind, "Sample source selected");

    tokio::spawn(run_dispatcher(effect_rx, store.clone(), source));
    spawn_heartbeat(engine.clone(), bucket);

    let workspaces = WorkspaceService::new(store, engine.clone());
    let workspace_id = config
        .engine
        .workspace
        .clone()
        .unwrap_or_else(|| DEFAULT_WORKSPACE_ID.to_string());
    let charts = workspaces.activate(&workspace_id).await?;
    tracing::info!(workspace = %workspace_id, charts = charts.len(), "Workspace restored");

    let app_state = Arc::new(AppState {
        engine,
        workspaces,
        stream_interval: config.stream.interval(),
        nodes,
    });

    let addr: SocketAddr = config
        .server
        .bind
        .parse()
        .with_context(|| format!("Invalid bind address {}", config.server.bind))?;
    tracing::info!(%addr, "Starting telemetry-tracer");

    axum::serve(tokio::net::TcpListener::bind(addr).await?, router(app_state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
