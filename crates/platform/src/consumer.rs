//
// Copyright (c) 2025 SOUNDVAULT LABS LLC
// This source code is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Project: soundvault — Secure audio ingest with envelope encryption.
//

//! Consumer pipeline: pull event → fetch sidecar + ciphertext → unwrap →
//! streaming decrypt → deliver plaintext to the processor sink → ack.
//!
//! The ack is the last thing that happens, and only after the sink reports
//! success — any earlier failure leaves the event unacked, so the stream
//! redelivers it after ack-wait. Sinks must therefore tolerate duplicate
//! execution; the shipped [`FileSink`] overwrites deterministically via
//! temp-file + atomic rename.

use async_trait::async_trait;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::io::SyncIoBridge;
use tracing::{info, warn};
use uuid::Uuid;

use soundvault_core::{decrypt_inner_stream, unwrap_data_key, MasterKey};
use soundvault_types::event::UploadEvent;
use soundvault_types::sidecar::EnvelopeSidecar;

use crate::bus::{EventBus, PULL_WAIT};
use crate::error::ServiceError;
use crate::retry::with_backoff;
use crate::store::ObjectStore;

/// Identity handed to the sink along with the plaintext.
#[derive(Debug, Clone)]
pub struct ProcessingMeta {
    pub principal: String,
    pub object_id: Uuid,
    pub original_name: String,
}

/// External processor boundary.
///
/// Receives the decrypted plaintext as a scratch file path plus the object's
/// identity. Implementations own idempotency: the same object may be
/// delivered more than once and the final state must not differ from a
/// single delivery.
#[async_trait]
pub trait PlaintextSink: Send + Sync {
    async fn deliver(&self, meta: &ProcessingMeta, plaintext: &Path) -> Result<(), ServiceError>;
}

/// Sink that lands plaintext at `{out_dir}/{principal}/{object_id}/{name}`.
///
/// Writes to a temp file in the destination directory and renames into
/// place, so duplicate deliveries overwrite atomically and readers never see
/// partial bytes.
pub struct FileSink {
    out_dir: PathBuf,
}

impl FileSink {
    pub fn new(out_dir: PathBuf) -> Self {
        Self { out_dir }
    }
}

#[async_trait]
impl PlaintextSink for FileSink {
    async fn deliver(&self, meta: &ProcessingMeta, plaintext: &Path) -> Result<(), ServiceError> {
        let dest_dir = self
            .out_dir
            .join(&meta.principal)
            .join(meta.object_id.to_string());
        tokio::fs::create_dir_all(&dest_dir).await?;

        let dest = dest_dir.join(&meta.original_name);
        let staging = dest_dir.join(format!(".{}.partial", meta.original_name));

        tokio::fs::copy(plaintext, &staging).await?;
        tokio::fs::rename(&staging, &dest).await?;
        Ok(())
    }
}

pub struct ConsumerPipeline {
    store: Arc<dyn ObjectStore>,
    bus: Arc<dyn EventBus>,
    master_key: Arc<MasterKey>,
    sink: Arc<dyn PlaintextSink>,
    pull_wait: Duration,
}

impl ConsumerPipeline {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        bus: Arc<dyn EventBus>,
        master_key: Arc<MasterKey>,
        sink: Arc<dyn PlaintextSink>,
    ) -> Self {
        Self {
            store,
            bus,
            master_key,
            sink,
            pull_wait: PULL_WAIT,
        }
    }

    /// Worker loop: pull and process until the task is dropped. Each worker
    /// handles one message at a time; parallelism comes from running several
    /// workers against the shared durable consumer.
    pub async fn run_worker(self: Arc<Self>, worker: usize) {
        info!(worker, "consumer worker started");
        loop {
            match self.step().await {
                Ok(_) => {}
                Err(err) => {
                    warn!(worker, error = %err, "pull failed, backing off");
                    tokio::time::sleep(Duration::from_secs(1)).await;
                }
            }
        }
    }

    /// Pull at most one message and process it. Returns `true` when a
    /// message was handled (acked or deliberately left unacked), `false`
    /// when the pull window elapsed empty.
    pub async fn step(&self) -> Result<bool, ServiceError> {
        let Some(delivery) = self.bus.pull(self.pull_wait).await? else {
            return Ok(false);
        };

        match self.process(&delivery.payload).await {
            Ok(event) => {
                delivery.ack().await?;
                info!(
                    principal = %event.principal,
                    object_id = %event.object_id,
                    event_id = %event.event_id,
                    "object processed and acked"
                );
            }
            Err(err) => {
                // No ack: the event redelivers after ack-wait. Repeated
                // failures keep the event visible for operator inspection.
                warn!(error = %err, "event processing failed, leaving unacked");
            }
        }
        Ok(true)
    }

    /// Steps 2-7 for one event payload.
    async fn process(&self, payload: &[u8]) -> Result<UploadEvent, ServiceError> {
        let event = UploadEvent::from_json(payload)
            .map_err(|e| ServiceError::format(format!("event parse: {e}")))?;

        // Sidecar first: it carries the wrapped key.
        let sidecar_bytes = with_backoff("sidecar fetch", || {
            self.store.get_bytes(&event.envelope_ref)
        })
        .await?;
        let sidecar = EnvelopeSidecar::from_json(&sidecar_bytes)
            .map_err(|e| ServiceError::format(format!("sidecar parse: {e}")))?;

        let data_key =
            unwrap_data_key(&sidecar.wrapped_data_key, &self.master_key).map_err(|err| {
                // Unwrap failure means master-key mismatch or tampering —
                // unrecoverable here, so flag it for the operator.
                warn!(object_id = %event.object_id, "data key unwrap failed");
                ServiceError::from(err)
            })?;

        // Stream ciphertext → plaintext scratch. The bridge hands the async
        // reader to the blocking decryptor; the data key moves in and is
        // zeroized when the closure drops it.
        let ciphertext = with_backoff("ciphertext open", || {
            self.store.get_stream(&event.ciphertext_ref)
        })
        .await?;
        let bridge = SyncIoBridge::new(ciphertext);

        let expected = sidecar.original_size;
        let plaintext_scratch = tokio::task::spawn_blocking(move || {
            let mut scratch = tempfile::NamedTempFile::new()?;
            let written = {
                let mut src = BufReader::new(bridge);
                let mut sink = BufWriter::new(scratch.as_file_mut());
                decrypt_inner_stream(&mut src, &mut sink, &data_key)?
            };
            if written != expected {
                return Err(ServiceError::format(format!(
                    "plaintext is {written} bytes, sidecar says {expected}"
                )));
            }
            Ok::<_, ServiceError>(scratch)
        })
        .await
        .map_err(|e| ServiceError::transient(format!("decrypt stage panicked: {e}")))??;

        let meta = ProcessingMeta {
            principal: event.principal.clone(),
            object_id: event.object_id,
            original_name: sidecar.original_filename.clone(),
        };
        self.sink.deliver(&meta, plaintext_scratch.path()).await?;

        Ok(event)
    }
}
