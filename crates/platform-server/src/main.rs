//
// Copyright (c) 2025 SOUNDVAULT LABS LLC
// This source code is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Project: soundvault — Secure audio ingest with envelope encryption.
//

//! Soundvault ingest server — thin entry point for the Axum HTTP service.
//!
//! All routing and pipeline logic lives in `soundvault_platform`. This binary
//! is responsible only for: CLI parsing, env config loading, backend
//! construction, AppState wiring, server binding, and graceful shutdown.
//! A missing or invalid MASTER_KEY aborts startup with a non-zero exit.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::sync::Arc;

use soundvault_platform::bus::JetStreamEventBus;
use soundvault_platform::credentials::MemoryCredentialStore;
use soundvault_platform::http::{create_router, AppState};
use soundvault_platform::ingest::IngestPipeline;
use soundvault_platform::listing::ListingApi;
use soundvault_platform::session::SessionRegistry;
use soundvault_platform::store::S3ObjectStore;
use soundvault_platform::Config;

/// Soundvault ingest server — secure audio ingest with envelope encryption.
#[derive(Parser)]
#[command(
    name = "soundvault-platform-server",
    version = env!("CARGO_PKG_VERSION"),
    about = "Soundvault ingest server — secure audio ingest with envelope encryption"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server (default)
    Serve,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve().await,
    }
}

async fn serve() -> Result<()> {
    tracing_subscriber::fmt::init();

    let config = Config::from_env().map_err(|e| anyhow::anyhow!("{e}"))?;

    tracing::info!(
        "soundvault-platform-server v{} starting",
        env!("CARGO_PKG_VERSION")
    );
    tracing::info!("Port: {}", config.port);
    tracing::info!("Bucket: {}", config.object_store.bucket);
    tracing::info!(
        "Routes: POST /api/validate-passphrase, POST /api/upload, GET/DELETE /api/files, POST /api/logout, GET /healthz"
    );

    let credentials: Arc<MemoryCredentialStore> = match &config.credentials_path {
        Some(path) => {
            let store = MemoryCredentialStore::from_json_file(path)
                .map_err(|e| anyhow::anyhow!("{e}"))?;
            tracing::info!(principals = store.len(), "credential store loaded");
            Arc::new(store)
        }
        None => {
            tracing::warn!("CREDENTIALS_PATH not set — no principal can authenticate");
            Arc::new(MemoryCredentialStore::new([]))
        }
    };

    let store = Arc::new(
        S3ObjectStore::connect(&config.object_store)
            .await
            .map_err(|e| anyhow::anyhow!("{e}"))?,
    );
    let bus = Arc::new(
        JetStreamEventBus::connect(&config.event_bus_url)
            .await
            .map_err(|e| anyhow::anyhow!("{e}"))?,
    );

    let master_key = Arc::new(config.master_key);
    let pipeline = Arc::new(IngestPipeline::new(
        store.clone(),
        bus,
        credentials.clone(),
        master_key,
        config.object_store.bucket.clone(),
    ));
    let listing = Arc::new(ListingApi::new(store));

    let sessions = SessionRegistry::new(config.session_idle);
    let sweeper = sessions.spawn_sweeper(config.session_sweep);

    let state = AppState {
        pipeline,
        listing,
        sessions,
        credentials,
        max_upload_bytes: config.max_upload_bytes,
    };

    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port)).await?;

    tracing::info!("Listening on 0.0.0.0:{}", config.port);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    sweeper.abort();
    tracing::info!("Server shut down cleanly");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
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

    tracing::info!("Shutdown signal received, draining connections...");
}
