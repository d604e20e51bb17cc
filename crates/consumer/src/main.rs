//
// Copyright (c) 2025 SOUNDVAULT LABS LLC
// This source code is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Project: soundvault — Secure audio ingest with envelope encryption.
//

//! Soundvault consumer worker — thin entry point for the event consumer.
//!
//! Spawns N workers against the shared durable pull consumer; each worker
//! processes one event at a time. Plaintext lands in the file sink under
//! CONSUMER_OUT_DIR. Unacked events redeliver after ack-wait, so a crashed
//! worker loses nothing.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;

use soundvault_platform::bus::JetStreamEventBus;
use soundvault_platform::consumer::{ConsumerPipeline, FileSink};
use soundvault_platform::store::S3ObjectStore;
use soundvault_platform::Config;

/// Soundvault consumer worker — decrypts ingested objects for processing.
#[derive(Parser)]
#[command(
    name = "soundvault-consumer",
    version = env!("CARGO_PKG_VERSION"),
    about = "Soundvault consumer worker — pulls upload events and decrypts objects"
)]
struct Cli {
    /// Number of parallel workers (overrides CONSUMER_WORKERS).
    #[arg(long)]
    workers: Option<usize>,

    /// Output directory for processed plaintext (overrides CONSUMER_OUT_DIR).
    #[arg(long)]
    out_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = Config::from_env().map_err(|e| anyhow::anyhow!("{e}"))?;

    let workers = cli.workers.unwrap_or(config.consumer_workers).max(1);
    let out_dir = cli.out_dir.unwrap_or_else(|| config.consumer_out_dir.clone());

    tracing::info!(
        "soundvault-consumer v{} starting",
        env!("CARGO_PKG_VERSION")
    );
    tracing::info!(workers, out_dir = %out_dir.display(), "consumer configuration");

    tokio::fs::create_dir_all(&out_dir).await?;

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
    let sink = Arc::new(FileSink::new(out_dir));
    let master_key = Arc::new(config.master_key);

    let pipeline = Arc::new(ConsumerPipeline::new(store, bus, master_key, sink));

    let handles: Vec<_> = (0..workers)
        .map(|worker| tokio::spawn(Arc::clone(&pipeline).run_worker(worker)))
        .collect();

    shutdown_signal().await;
    tracing::info!("Shutdown signal received, stopping workers...");

    for handle in &handles {
        handle.abort();
    }
    for handle in handles {
        // Aborted tasks report JoinError::is_cancelled — that is clean exit.
        let _ = handle.await;
    }

    tracing::info!("Consumer shut down cleanly");
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
}
