//! `wharf` — the file-transfer relay server binary: loads config, wires up
//! storage/registry/orchestrator, and serves the endpoints in spec.md §6.
//!
//! Grounded in `alloy-transport/src/websocket/server.rs` /
//! `http/server.rs` for the `Router::new().route(...).with_state(...)` +
//! `axum::serve` shape, and in `alloy-runtime::runtime::AlloyRuntime::run`
//! for the multi-thread runtime + `tokio::signal` shutdown pattern.

mod handlers;
mod params;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::Router;
use axum::routing::get;
use tower_http::trace::TraceLayer;
use wharf_orchestrator::{Orchestrator, OrchestratorConfig};
use wharf_registry::HostMap;
use wharf_runtime::{LoggingBuilder, WharfConfig, build_saved_connections};
use wharf_transport::host_conn::DEFAULT_QUERY_TIMEOUT;

use state::AppState;

#[tokio::main(flavor = "multi_thread")]
async fn main() -> anyhow::Result<()> {
    let _log_guard = LoggingBuilder::new().init();

    let config = WharfConfig::from_env().context("failed to load configuration from the environment")?;
    tracing::info!(port = config.port, "configuration loaded");

    let saved_connections = build_saved_connections(
        &config.database_datasource_path,
        &config.database_migrations_path,
        config.saved_connections_valid_for_days,
    )
    .await
    .context("failed to initialize sqlite-backed SavedConnections store")?;

    let hosts = HostMap::new();
    let orchestrator = Arc::new(Orchestrator::new(
        hosts.clone(),
        Arc::new(saved_connections),
        OrchestratorConfig {
            chunk_query_timeout: Duration::from_secs(config.chunk_query_timeout_secs),
            allow_reconnect_without_record: config.allow_reconnect_without_record,
        },
    ));

    let state = AppState {
        orchestrator,
        hosts,
        batch_size: config.batch_size,
        client_io_timeout: DEFAULT_QUERY_TIMEOUT,
    };

    let app = router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr).await.context("failed to bind listener")?;
    tracing::info!(%addr, "wharf listening");

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    Ok(())
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/host/connect", get(handlers::connect))
        .route("/api/v1/host/reconnect/{host_id}", get(handlers::reconnect))
        .route("/api/v1/host/metadata/{host_id}/{resource_id}", get(handlers::metadata_root))
        .route("/api/v1/host/metadata/{host_id}/{resource_id}/{*path}", get(handlers::metadata))
        .route("/api/v1/host/download/{host_id}/{resource_id}", get(handlers::download_root))
        .route("/api/v1/host/download/{host_id}/{resource_id}/{*path}", get(handlers::download))
        .route("/api/v1/host/upload/{host_id}/{resource_id}", get(handlers::upload_root))
        .route("/api/v1/host/upload/{host_id}/{resource_id}/{*path}", get(handlers::upload))
        .route("/api/v1/host/directory/create/{host_id}/{resource_id}", get(handlers::create_directory_root))
        .route(
            "/api/v1/host/directory/create/{host_id}/{resource_id}/{*path}",
            get(handlers::create_directory),
        )
        .route("/api/v1/host/resource/delete/{host_id}/{resource_id}", get(handlers::delete_resource_root))
        .route(
            "/api/v1/host/resource/delete/{host_id}/{resource_id}/{*path}",
            get(handlers::delete_resource),
        )
        .route("/api/v1/ping", get(handlers::ping))
        .route("/api/v1/config", get(handlers::config))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown signal received");
}
