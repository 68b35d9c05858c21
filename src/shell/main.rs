use anyhow::Context;
use product_catalog::shared::config::ServiceConfig;
use product_catalog::shared::infrastructure::event_publisher::dapr::DaprEventPublisher;
use product_catalog::shell::http::router;
use product_catalog::shell::state::AppState;
use product_catalog::shell::workers::spawn_ledger_pruner;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug")),
        )
        .init();

    let config = ServiceConfig::load().context("loading configuration")?;
    let publisher = DaprEventPublisher::new(
        config.dapr_http_url.clone(),
        config.pubsub_name.clone(),
        config.service_name.clone(),
    );

    let shutdown = CancellationToken::new();
    let state = AppState::in_memory(config.clone(), Arc::new(publisher), shutdown.clone());
    let pruner = spawn_ledger_pruner(
        state.ledger.clone(),
        config.ledger_retention(),
        config.ledger_prune_interval(),
        shutdown.clone(),
    );

    let listener = tokio::net::TcpListener::bind(&config.bind_address)
        .await
        .with_context(|| format!("binding {}", config.bind_address))?;
    info!(
        address = %config.bind_address,
        instance_id = %config.instance_id,
        pubsub = %config.pubsub_name,
        "product catalog service listening"
    );

    axum::serve(listener, router(state.clone()))
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await
        .context("serving http")?;

    state.import_runs.close();
    state.import_runs.wait().await;
    state.emitter.flush().await;
    pruner.await.ok();
    info!("product catalog service stopped");
    Ok(())
}

async fn shutdown_signal(shutdown: CancellationToken) {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::warn!(%error, "could not listen for shutdown signal");
    }
    info!("shutdown requested, finishing in-flight work");
    shutdown.cancel();
}
