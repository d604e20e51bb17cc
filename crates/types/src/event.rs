//
// Copyright (c) 2025 SOUNDVAULT LABS LLC
// This source code is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Project: soundvault — Secure audio ingest with envelope encryption.
//

//! Upload event payload published to the durable stream.
//!
//! One event per successfully ingested object. The wire names (`email`,
//! `file_uuid`, `s3_data_key`, `s3_metadata_key`, `bucket_name`) come from the
//! deployed consumer fleet; the Rust field names describe what each value is.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Durable stream name holding upload events.
pub const STREAM_NAME: &str = "FILE_UPLOADS";

/// Subject upload events are published under.
pub const SUBJECT: &str = "file.uploads";

/// Durable pull-consumer name shared by all consumer workers.
pub const CONSUMER_NAME: &str = "file_processor";

/// Event published once per committed Object, pointing back at the object
/// store. The event holds references only — never ciphertext, never keys.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadEvent {
    pub event_id: Uuid,

    /// Owning principal (email-shaped on the wire).
    #[serde(rename = "email")]
    pub principal: String,

    #[serde(rename = "file_uuid")]
    pub object_id: Uuid,

    #[serde(rename = "s3_data_key")]
    pub ciphertext_ref: String,

    #[serde(rename = "s3_metadata_key")]
    pub envelope_ref: String,

    #[serde(rename = "bucket_name")]
    pub store_bucket: String,

    /// Milliseconds since the Unix epoch.
    pub ts_ms: i64,
}

impl UploadEvent {
    pub fn to_json(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    pub fn from_json(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}
