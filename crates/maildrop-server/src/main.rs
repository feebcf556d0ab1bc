use std::future::IntoFuture;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing::info;
use tracing_subscriber::EnvFilter;

use maildrop_server::{AppState, Cli, create_router};
use maildrop_storage::{MessageStoreConfig, RedbMessageStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level)),
        )
        .init();

    let metrics = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("installing metrics recorder: {e}"))?;
    maildrop_storage::metrics::describe_metrics();

    let store = Arc::new(
        RedbMessageStore::open(MessageStoreConfig {
            db_path: cli.storage_path.clone(),
            retention: cli.retention,
            gc_interval: cli.gc_interval,
        })
        .context("opening message store")?,
    );

    let state = AppState {
        store: store.clone(),
        push_interval: cli.push_interval,
        metrics: Some(metrics),
    };

    let listener = tokio::net::TcpListener::bind(cli.listen_address)
        .await
        .with_context(|| format!("binding {}", cli.listen_address))?;
    info!(address = %cli.listen_address, "Listening for web requests");

    // Watch connections never end on their own, so dropping the server on
    // shutdown (rather than draining it) is what ends the sessions.
    tokio::select! {
        result = axum::serve(listener, create_router(state)).into_future() => {
            result.context("serving HTTP")?;
        }
        _ = shutdown_signal() => {
            info!("Shutdown signal received");
        }
    }

    store.close().await;
    info!("Message store closed");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        // Without a signal handler, wait forever rather than exit early.
        std::future::pending::<()>().await;
    }
}
