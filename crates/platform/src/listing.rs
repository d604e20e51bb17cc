//
// Copyright (c) 2025 SOUNDVAULT LABS LLC
// This source code is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Project: soundvault — Secure audio ingest with envelope encryption.
//

//! Listing and deletion of a principal's objects.
//!
//! Both operations are bounded to the authenticated principal's prefix.
//! Listing decodes sidecars and returns their descriptive fields — the
//! wrapped data key stays server-side. Deletion removes both siblings and is
//! idempotent: deleting something already gone reports `found: false` rather
//! than an error.

use serde::Serialize;
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

use soundvault_types::keys::ObjectKeys;
use soundvault_types::sidecar::{EnvelopeSidecar, VerificationStatus};

use crate::error::ServiceError;
use crate::store::ObjectStore;

/// One listed object: the sidecar's descriptive fields plus identity.
/// Deliberately no wrapped key.
#[derive(Debug, Serialize)]
pub struct ObjectRecord {
    pub object_id: Uuid,
    pub original_filename: String,
    pub original_size: u64,
    pub encrypted_size: u64,
    pub verification_status: VerificationStatus,
    pub timestamp: i64,
    pub algorithm: String,
    pub version: String,
}

pub struct ListingApi {
    store: Arc<dyn ObjectStore>,
}

impl ListingApi {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    /// Enumerate a principal's objects from their sidecars.
    ///
    /// Sidecars that fail to parse are logged and skipped — one corrupt
    /// object must not hide the rest of the listing.
    pub async fn list_objects(&self, principal: &str) -> Result<Vec<ObjectRecord>, ServiceError> {
        let prefix = ObjectKeys::principal_prefix(principal);
        let keys = self.store.list(&prefix).await?;

        let mut records = Vec::new();
        for key in keys.into_iter().filter(|k| ObjectKeys::is_sidecar(k)) {
            let Some(object_id) = ObjectKeys::parse_uuid(&key) else {
                warn!(%key, "sidecar key outside expected layout, skipping");
                continue;
            };

            let bytes = match self.store.get_bytes(&key).await {
                Ok(bytes) => bytes,
                Err(err) => {
                    warn!(%key, error = %err, "sidecar fetch failed, skipping");
                    continue;
                }
            };

            match EnvelopeSidecar::from_json(&bytes) {
                Ok(sidecar) => records.push(ObjectRecord {
                    object_id,
                    original_filename: sidecar.original_filename,
                    original_size: sidecar.original_size,
                    encrypted_size: sidecar.encrypted_size,
                    verification_status: sidecar.verification_status,
                    timestamp: sidecar.timestamp,
                    algorithm: sidecar.algorithm,
                    version: sidecar.version,
                }),
                Err(err) => {
                    warn!(%key, error = %err, "unparseable sidecar, skipping");
                }
            }
        }

        // Newest first — stable for clients that render the list directly.
        records.sort_by_key(|r| std::cmp::Reverse(r.timestamp));
        Ok(records)
    }

    /// Delete both siblings of an object. Returns whether anything existed.
    ///
    /// `original_name` may arrive with or without a ciphertext suffix
    /// (`.enc` / legacy `.encrypted`); both spellings address the same
    /// stored key.
    pub async fn delete_object(
        &self,
        principal: &str,
        object_id: &Uuid,
        original_name: &str,
    ) -> Result<bool, ServiceError> {
        let object_prefix = ObjectKeys::object_prefix(principal, object_id);
        let existing = self.store.list(&object_prefix).await?;
        if existing.is_empty() {
            return Ok(false);
        }

        let ciphertext_ref = ObjectKeys::ciphertext(principal, object_id, original_name);
        let envelope_ref = ObjectKeys::sidecar(principal, object_id);

        self.store.delete(&ciphertext_ref).await?;
        self.store.delete(&envelope_ref).await?;
        Ok(true)
    }
}
