mod config;
mod error;
mod middleware;
mod routes;
mod state;

use std::sync::Arc;

use anyhow::Context;
use fileserver_core::staging::StagingDir;
use fileserver_core::store::{PgDocumentRepository, S3ObjectStore};
use fileserver_core::DocumentService;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let profile = config::Profile::from_env()?;
    profile.load_env_file()?;

    let config = config::AppConfig::from_env().context("Failed to load config")?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .json()
        .init();

    install_panic_hook();

    tracing::info!(?profile, "Starting file server");

    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .min_connections(config.db_min_connections)
        .connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;

    tracing::info!("Connected to PostgreSQL");

    sqlx::migrate!("../../migrations")
        .run(&pool)
        .await
        .context("Failed to run migrations")?;

    tracing::info!("Database migrations applied");

    let objects = S3ObjectStore::connect(&config.s3).await;
    let staging = StagingDir::new(&config.upload_dir);
    tracing::info!(
        upload_dir = %staging.root().display(),
        bucket = %config.bucket,
        fingerprint_mode = %config.fingerprint_mode,
        delete_blob_on_delete = config.delete_blob_on_delete,
        "Document service configured"
    );

    let documents = DocumentService::new(
        Arc::new(PgDocumentRepository::new(pool)),
        Arc::new(objects),
        staging,
        config.service_settings(),
    );

    let state = state::AppState::new(documents);

    routes::log_routes();
    let app = routes::build_router(state).layer(middleware::request_tracing::trace_layer());

    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    tracing::info!("Listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shut down gracefully");
    Ok(())
}

/// Log any panic through tracing, then terminate: no attempt to keep serving
/// from a process in an unknown state.
fn install_panic_hook() {
    std::panic::set_hook(Box::new(|info| {
        let location = info
            .location()
            .map(|l| format!("{}:{}", l.file(), l.line()))
            .unwrap_or_default();
        tracing::error!(%location, "Fatal error: {info}");
        std::process::exit(1);
    }));
}

/// Wait for SIGINT (Ctrl+C) or SIGTERM for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => { tracing::info!("Received Ctrl+C, shutting down..."); }
        _ = terminate => { tracing::info!("Received SIGTERM, shutting down..."); }
    }
}
