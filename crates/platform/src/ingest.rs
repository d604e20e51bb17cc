//
// Copyright (c) 2025 SOUNDVAULT LABS LLC
// This source code is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Project: soundvault — Secure audio ingest with envelope encryption.
//

//! Ingest pipeline: verify the client layer, re-encrypt under a fresh data
//! key, persist ciphertext + sidecar, publish the upload event.
//!
//! Write ordering is strict and observable: ciphertext, then sidecar, then
//! event. A sidecar failure rolls back the ciphertext (best effort) before
//! the error surfaces; an event failure leaves both siblings in place for a
//! later reconciliation pass. Scratch files are anonymous temp files owned
//! by the request and vanish on every exit path.

use std::fs::File;
use std::io::{BufReader, BufWriter, Seek, SeekFrom};
use std::sync::Arc;
use tempfile::NamedTempFile;
use tracing::{info, warn};
use uuid::Uuid;

use soundvault_core::{
    decrypt_outer_stream, encrypt_inner_stream, wrap_data_key, MasterKey, OuterSummary,
};
use soundvault_types::event::UploadEvent;
use soundvault_types::keys::ObjectKeys;
use soundvault_types::now_ms;
use soundvault_types::sidecar::{EnvelopeSidecar, VerificationStatus};

use crate::bus::EventBus;
use crate::credentials::CredentialStore;
use crate::error::ServiceError;
use crate::retry::with_backoff;
use crate::store::ObjectStore;

/// Result of a committed ingest, echoed to the client.
#[derive(Debug)]
pub struct IngestOutcome {
    pub object_id: Uuid,
    pub verification_status: VerificationStatus,
}

pub struct IngestPipeline {
    store: Arc<dyn ObjectStore>,
    bus: Arc<dyn EventBus>,
    credentials: Arc<dyn CredentialStore>,
    master_key: Arc<MasterKey>,
    bucket: String,
}

impl IngestPipeline {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        bus: Arc<dyn EventBus>,
        credentials: Arc<dyn CredentialStore>,
        master_key: Arc<MasterKey>,
        bucket: String,
    ) -> Self {
        Self {
            store,
            bus,
            credentials,
            master_key,
            bucket,
        }
    }

    /// Run the full ingest for one upload.
    ///
    /// `outer_blob` is the client-encrypted body, already spooled to a
    /// scratch file by the HTTP layer (positioned anywhere; it is rewound
    /// here).
    pub async fn ingest(
        &self,
        principal: &str,
        passphrase: &str,
        original_name: &str,
        outer_blob: File,
    ) -> Result<IngestOutcome, ServiceError> {
        validate_object_name(original_name)?;

        // Step 1: the provided passphrase must be the one registered for the
        // principal. Unknown principal and wrong passphrase are the same
        // detail-free failure; the comparison is constant-time.
        let registered = self
            .credentials
            .passphrase_for(principal)
            .ok_or(ServiceError::Auth)?;
        if !registered.matches(passphrase) {
            return Err(ServiceError::Auth);
        }

        // Steps 2-5: streaming decrypt-verify into scratch S1, re-encrypt
        // into scratch S2, wrap the data key. CPU-bound, so off the async
        // worker. The data key never leaves the closure — it is wrapped and
        // dropped (zeroized) inside.
        let passphrase = passphrase.to_string();
        let master_key = Arc::clone(&self.master_key);
        let (outer, ciphertext_length, wrapped_key, ciphertext_scratch) =
            tokio::task::spawn_blocking(move || {
                run_crypto_stage(outer_blob, &passphrase, &master_key)
            })
            .await
            .map_err(|e| ServiceError::transient(format!("crypto stage panicked: {e}")))??;

        // Step 6: fresh object identity and deterministic key layout.
        let object_id = Uuid::new_v4();
        let ciphertext_ref = ObjectKeys::ciphertext(principal, &object_id, original_name);
        let envelope_ref = ObjectKeys::sidecar(principal, &object_id);

        // Step 7: ciphertext first.
        with_backoff("ciphertext put", || {
            self.store
                .put_stream(&ciphertext_ref, ciphertext_length, ciphertext_scratch.path())
        })
        .await?;

        // Step 8: the sidecar binding ciphertext to its wrapped key.
        let verification_status = if outer.verified {
            VerificationStatus::Verified
        } else {
            VerificationStatus::NotVerified
        };
        let sidecar = EnvelopeSidecar::new(
            wrapped_key,
            original_name.to_string(),
            outer.bytes_written,
            ciphertext_length,
            verification_status,
            now_ms(),
        );
        let sidecar_json = sidecar
            .to_json()
            .map_err(|e| ServiceError::format(format!("sidecar encode: {e}")))?;

        // Step 9: sidecar; roll the ciphertext back if it cannot land.
        if let Err(err) = with_backoff("sidecar put", || {
            self.store
                .put_small(&envelope_ref, "application/json", sidecar_json.clone())
        })
        .await
        {
            warn!(principal, %object_id, error = %err, "sidecar write failed, rolling back ciphertext");
            if let Err(cleanup_err) = self.store.delete(&ciphertext_ref).await {
                warn!(principal, %object_id, error = %cleanup_err, "ciphertext rollback failed");
            }
            return Err(err);
        }

        // Step 10: the durable event. A failure here leaves the committed
        // siblings in place; consumers simply never hear about them until a
        // reconciliation replay.
        let event = UploadEvent {
            event_id: Uuid::new_v4(),
            principal: principal.to_string(),
            object_id,
            ciphertext_ref: ciphertext_ref.clone(),
            envelope_ref,
            store_bucket: self.bucket.clone(),
            ts_ms: now_ms(),
        };
        let payload = event
            .to_json()
            .map_err(|e| ServiceError::format(format!("event encode: {e}")))?;

        with_backoff("event publish", || self.bus.publish(payload.clone())).await?;

        info!(
            principal,
            %object_id,
            original_size = outer.bytes_written,
            encrypted_size = ciphertext_length,
            status = verification_status.as_str(),
            "object ingested"
        );

        Ok(IngestOutcome {
            object_id,
            verification_status,
        })
    }
}

/// Steps 2-5 on a blocking thread: outer decrypt-verify → inner re-encrypt →
/// data-key wrap.
fn run_crypto_stage(
    mut outer_blob: File,
    passphrase: &str,
    master_key: &MasterKey,
) -> Result<(OuterSummary, u64, String, NamedTempFile), ServiceError> {
    outer_blob.seek(SeekFrom::Start(0))?;

    // S1: plaintext scratch. Anonymous — unlinked before it ever holds data.
    let mut plaintext_scratch = tempfile::tempfile()?;
    let outer = {
        let mut src = BufReader::new(&mut outer_blob);
        let mut sink = BufWriter::new(&mut plaintext_scratch);
        decrypt_outer_stream(&mut src, &mut sink, passphrase)?
    };

    // S2: inner ciphertext scratch. Named so the store can stream from it.
    plaintext_scratch.seek(SeekFrom::Start(0))?;
    let mut ciphertext_scratch = NamedTempFile::new()?;
    let inner = {
        let mut src = BufReader::new(&mut plaintext_scratch);
        let mut sink = BufWriter::new(ciphertext_scratch.as_file_mut());
        encrypt_inner_stream(&mut src, &mut sink)?
    };

    let wrapped = wrap_data_key(&inner.data_key, master_key)?;
    let ciphertext_length = inner.ciphertext_length;
    // inner (and with it the plaintext data key) drops here — zeroized.

    Ok((outer, ciphertext_length, wrapped, ciphertext_scratch))
}

/// Uploaded names become object-key path segments; keep them to one segment.
fn validate_object_name(name: &str) -> Result<(), ServiceError> {
    if name.is_empty() {
        return Err(ServiceError::format("file name must not be empty"));
    }
    if name.contains('/') || name.contains('\\') || name == "." || name == ".." {
        return Err(ServiceError::format("file name must be a plain name"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_name_validation() {
        assert!(validate_object_name("take-01.wav").is_ok());
        assert!(validate_object_name("").is_err());
        assert!(validate_object_name("a/b.wav").is_err());
        assert!(validate_object_name("..").is_err());
        assert!(validate_object_name("c:\\clip.wav").is_err());
    }
}
