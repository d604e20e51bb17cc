//
// Copyright (c) 2025 SOUNDVAULT LABS LLC
// This source code is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Project: soundvault — Secure audio ingest with envelope encryption.
//

//! Object-store key layout.
//!
//! Both services address objects through these templates; the layout is a
//! byte-exact compatibility contract:
//!
//! ```text
//! uploads/{principal}/{uuid}/{original_name}.enc
//! uploads/{principal}/{uuid}/metadata.json
//! ```

use uuid::Uuid;

/// Root prefix for all object keys.
pub const UPLOADS_PREFIX: &str = "uploads";

/// File name of the envelope sidecar within an object's directory.
pub const SIDECAR_NAME: &str = "metadata.json";

/// Suffix appended to ciphertext object names.
pub const CIPHERTEXT_SUFFIX: &str = ".enc";

/// Legacy ciphertext suffix tolerated on delete.
pub const LEGACY_CIPHERTEXT_SUFFIX: &str = ".encrypted";

/// Key-template constructors and parsers for the object store layout.
pub struct ObjectKeys;

impl ObjectKeys {
    /// `uploads/{principal}/` — the listing prefix for one principal.
    pub fn principal_prefix(principal: &str) -> String {
        format!("{UPLOADS_PREFIX}/{principal}/")
    }

    /// `uploads/{principal}/{uuid}/` — the prefix holding one object's pair.
    pub fn object_prefix(principal: &str, uuid: &Uuid) -> String {
        format!("{UPLOADS_PREFIX}/{principal}/{uuid}/")
    }

    /// `uploads/{principal}/{uuid}/{original_name}.enc`
    ///
    /// If `original_name` already carries a ciphertext suffix (`.enc` or the
    /// legacy `.encrypted`), it is used as-is rather than double-suffixed.
    pub fn ciphertext(principal: &str, uuid: &Uuid, original_name: &str) -> String {
        let name = if original_name.ends_with(CIPHERTEXT_SUFFIX)
            || original_name.ends_with(LEGACY_CIPHERTEXT_SUFFIX)
        {
            original_name.to_string()
        } else {
            format!("{original_name}{CIPHERTEXT_SUFFIX}")
        };
        format!("{UPLOADS_PREFIX}/{principal}/{uuid}/{name}")
    }

    /// `uploads/{principal}/{uuid}/metadata.json`
    pub fn sidecar(principal: &str, uuid: &Uuid) -> String {
        format!("{UPLOADS_PREFIX}/{principal}/{uuid}/{SIDECAR_NAME}")
    }

    /// Extract the object uuid from any key under the uploads layout.
    ///
    /// Returns `None` for keys that do not match
    /// `uploads/{principal}/{uuid}/...`.
    pub fn parse_uuid(key: &str) -> Option<Uuid> {
        let mut parts = key.split('/');
        if parts.next() != Some(UPLOADS_PREFIX) {
            return None;
        }
        let _principal = parts.next()?;
        let uuid = parts.next()?;
        // A key must address something inside the object directory.
        parts.next()?;
        Uuid::parse_str(uuid).ok()
    }

    /// True if `key` addresses an envelope sidecar.
    pub fn is_sidecar(key: &str) -> bool {
        key.starts_with(UPLOADS_PREFIX) && key.ends_with(SIDECAR_NAME)
    }
}
