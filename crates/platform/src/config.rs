//
// Copyright (c) 2025 SOUNDVAULT LABS LLC
// This source code is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Project: soundvault — Secure audio ingest with envelope encryption.
//

//! Service configuration loaded from environment variables.
//!
//! `MASTER_KEY` is the one hard requirement: without a valid base64-encoded
//! 32-byte master key the process must not come up, so `from_env` returns
//! `ConfigFatal` and the binaries exit non-zero. Everything else either has a
//! sensible default or is validated where it is first used.

use soundvault_core::{MasterKey, SecretString};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::ServiceError;

/// Default maximum upload body size: 100 MiB.
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 100 * 1024 * 1024;

/// Default session idle timeout in seconds (30 minutes).
pub const DEFAULT_SESSION_IDLE_SECONDS: u64 = 1800;

/// Default session sweep interval in seconds (5 minutes).
pub const DEFAULT_SESSION_SWEEP_SECONDS: u64 = 300;

/// Object store connection settings.
#[derive(Debug, Clone)]
pub struct ObjectStoreConfig {
    /// Custom endpoint for S3-compatible stores; `None` means plain AWS.
    pub endpoint: Option<String>,
    pub bucket: String,
    pub access_key: String,
    pub secret_key: SecretString,
    pub region: String,
}

/// Runtime configuration for the soundvault services.
///
/// Constructed once at startup and shared by `Arc`; deliberately not `Clone`
/// so the master key has exactly one live copy.
#[derive(Debug)]
pub struct Config {
    pub port: u16,
    pub object_store: ObjectStoreConfig,
    pub event_bus_url: String,
    pub master_key: MasterKey,
    pub max_upload_bytes: u64,
    pub session_idle: Duration,
    pub session_sweep: Duration,
    /// JSON file mapping principal → passphrase; the out-of-band credential
    /// bootstrap.
    pub credentials_path: Option<PathBuf>,
    pub consumer_workers: usize,
    pub consumer_out_dir: PathBuf,
}

impl Config {
    pub fn from_env() -> Result<Self, ServiceError> {
        dotenvy::dotenv().ok();

        let master_key_b64 = env::var("MASTER_KEY").map_err(|_| {
            ServiceError::ConfigFatal(
                "MASTER_KEY must be set (base64 of 32 random bytes)".to_string(),
            )
        })?;
        let master_key = MasterKey::from_base64(&master_key_b64)
            .map_err(|e| ServiceError::ConfigFatal(format!("MASTER_KEY invalid: {e}")))?;

        let bucket = env::var("OBJECT_STORE_BUCKET")
            .map_err(|_| ServiceError::ConfigFatal("OBJECT_STORE_BUCKET must be set".to_string()))?;
        let access_key = env::var("OBJECT_STORE_ACCESS_KEY").map_err(|_| {
            ServiceError::ConfigFatal("OBJECT_STORE_ACCESS_KEY must be set".to_string())
        })?;
        let secret_key = env::var("OBJECT_STORE_SECRET").map_err(|_| {
            ServiceError::ConfigFatal("OBJECT_STORE_SECRET must be set".to_string())
        })?;

        let object_store = ObjectStoreConfig {
            endpoint: env::var("OBJECT_STORE_ENDPOINT").ok(),
            bucket,
            access_key,
            secret_key: SecretString::new(secret_key),
            region: env::var("OBJECT_STORE_REGION").unwrap_or_else(|_| "us-east-1".to_string()),
        };

        let port = env::var("PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse()
            .unwrap_or(8080);

        let event_bus_url =
            env::var("EVENT_BUS_URL").unwrap_or_else(|_| "nats://127.0.0.1:4222".to_string());

        let max_upload_bytes = parse_u64("MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES);
        let session_idle =
            Duration::from_secs(parse_u64("SESSION_IDLE_SECONDS", DEFAULT_SESSION_IDLE_SECONDS));
        let session_sweep = Duration::from_secs(parse_u64(
            "SESSION_SWEEP_SECONDS",
            DEFAULT_SESSION_SWEEP_SECONDS,
        ));

        let credentials_path = env::var("CREDENTIALS_PATH").ok().map(PathBuf::from);

        let consumer_workers = parse_u64("CONSUMER_WORKERS", 1).max(1) as usize;
        let consumer_out_dir = env::var("CONSUMER_OUT_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./processed"));

        Ok(Config {
            port,
            object_store,
            event_bus_url,
            master_key,
            max_upload_bytes,
            session_idle,
            session_sweep,
            credentials_path,
            consumer_workers,
            consumer_out_dir,
        })
    }
}

fn parse_u64(var: &str, default: u64) -> u64 {
    env::var(var)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
