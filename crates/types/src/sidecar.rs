//
// Copyright (c) 2025 SOUNDVAULT LABS LLC
// This source code is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Project: soundvault — Secure audio ingest with envelope encryption.
//

//! Envelope sidecar JSON stored next to each ciphertext object.
//!
//! The sidecar binds a ciphertext to its wrapped data key and carries the
//! descriptive metadata the listing API returns. The serialized field set is
//! a compatibility contract: exactly these names, including `kek` for the
//! wrapped data key (a legacy misnomer — the field holds the *wrapped* key,
//! not the wrapping key — preserved because existing stores contain it).

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Sidecar format version emitted by this codebase.
pub const SIDECAR_VERSION: &str = "1.0";

/// Algorithm label emitted in every sidecar.
pub const SIDECAR_ALGORITHM: &str = "AES-GCM-256";

/// Decoded length of a well-formed `kek` field: nonce(12) || key(32) || tag(16).
pub const WRAPPED_KEY_DECODED_LEN: usize = 60;

#[derive(Error, Debug)]
pub enum SidecarError {
    #[error("sidecar is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("wrapped key field is not valid base64")]
    WrappedKeyEncoding,

    #[error("wrapped key decodes to {0} bytes, expected {WRAPPED_KEY_DECODED_LEN}")]
    WrappedKeyLength(usize),

    #[error("unsupported sidecar version: {0}")]
    UnsupportedVersion(String),
}

/// Outcome of the ingest-time client-layer verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VerificationStatus {
    #[serde(rename = "VERIFIED")]
    Verified,
    #[serde(rename = "NOT_VERIFIED")]
    NotVerified,
}

impl VerificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerificationStatus::Verified => "VERIFIED",
            VerificationStatus::NotVerified => "NOT_VERIFIED",
        }
    }
}

/// The envelope sidecar persisted at `uploads/{principal}/{uuid}/metadata.json`.
///
/// Field names are byte-exact on the wire. The Rust-side name for `kek` is
/// `wrapped_data_key` to keep call sites honest about what the field holds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvelopeSidecar {
    pub version: String,

    /// base64( nonce(12) || AES-GCM(master_key, nonce, data_key) || tag(16) ) — 80 chars.
    #[serde(rename = "kek")]
    pub wrapped_data_key: String,

    pub algorithm: String,
    pub original_filename: String,
    pub original_size: u64,
    pub encrypted_size: u64,
    pub verification_status: VerificationStatus,

    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
}

impl EnvelopeSidecar {
    /// Build a sidecar for a freshly ingested object.
    pub fn new(
        wrapped_data_key: String,
        original_filename: String,
        original_size: u64,
        encrypted_size: u64,
        verification_status: VerificationStatus,
        timestamp: i64,
    ) -> Self {
        Self {
            version: SIDECAR_VERSION.to_string(),
            wrapped_data_key,
            algorithm: SIDECAR_ALGORITHM.to_string(),
            original_filename,
            original_size,
            encrypted_size,
            verification_status,
            timestamp,
        }
    }

    /// Parse a sidecar from stored bytes and validate its wrapped-key shape.
    pub fn from_json(bytes: &[u8]) -> Result<Self, SidecarError> {
        let sidecar: EnvelopeSidecar = serde_json::from_slice(bytes)?;
        sidecar.validate()?;
        Ok(sidecar)
    }

    /// Serialize to the canonical JSON wire form.
    pub fn to_json(&self) -> Result<Vec<u8>, SidecarError> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Structural validation: version is known and `kek` decodes to 60 bytes.
    pub fn validate(&self) -> Result<(), SidecarError> {
        if self.version != SIDECAR_VERSION {
            return Err(SidecarError::UnsupportedVersion(self.version.clone()));
        }

        let decoded = BASE64
            .decode(&self.wrapped_data_key)
            .map_err(|_| SidecarError::WrappedKeyEncoding)?;

        if decoded.len() != WRAPPED_KEY_DECODED_LEN {
            return Err(SidecarError::WrappedKeyLength(decoded.len()));
        }

        Ok(())
    }
}
