//
// Copyright (c) 2025 SOUNDVAULT LABS LLC
// This source code is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Project: soundvault — Secure audio ingest with envelope encryption.
//

//! Credential store: passphrase ↔ principal resolution.
//!
//! The reverse lookup (`passphrase_for`) exists because the ingest path must
//! re-derive the client's PBKDF2 key server-side to verify the outer layer.
//! That implies recoverable passphrase storage — a deliberate, documented
//! trade-off. Passphrases live in [`SecretString`]s, are compared in
//! constant time, and are never logged.

use serde::Deserialize;
use soundvault_core::SecretString;
use std::collections::HashMap;
use std::path::Path;

use crate::error::ServiceError;

/// Resolves credentials to principals and back.
///
/// Implementations are bootstrapped out-of-band; the platform never creates
/// or mutates credentials at runtime.
pub trait CredentialStore: Send + Sync {
    /// Exact-match passphrase lookup. `None` for unknown passphrases.
    fn validate_passphrase(&self, passphrase: &str) -> Option<String>;

    /// Reverse lookup for the ingest verify path. The returned secret must
    /// not outlive the request that needed it.
    fn passphrase_for(&self, principal: &str) -> Option<SecretString>;
}

/// In-process credential store backed by a principal → passphrase map.
pub struct MemoryCredentialStore {
    by_principal: HashMap<String, SecretString>,
}

impl MemoryCredentialStore {
    pub fn new(pairs: impl IntoIterator<Item = (String, String)>) -> Self {
        Self {
            by_principal: pairs
                .into_iter()
                .map(|(principal, passphrase)| (principal, SecretString::new(passphrase)))
                .collect(),
        }
    }

    /// Load the out-of-band bootstrap file: a JSON object mapping principal
    /// (email-shaped string) to passphrase.
    pub fn from_json_file(path: &Path) -> Result<Self, ServiceError> {
        let raw = std::fs::read(path).map_err(|e| {
            ServiceError::ConfigFatal(format!("cannot read credentials file {path:?}: {e}"))
        })?;

        #[derive(Deserialize)]
        struct FileFormat(HashMap<String, String>);

        let FileFormat(pairs) = serde_json::from_slice(&raw).map_err(|e| {
            ServiceError::ConfigFatal(format!("credentials file {path:?} is not valid JSON: {e}"))
        })?;

        Ok(Self::new(pairs))
    }

    pub fn len(&self) -> usize {
        self.by_principal.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_principal.is_empty()
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn validate_passphrase(&self, passphrase: &str) -> Option<String> {
        self.by_principal
            .iter()
            .find(|(_, stored)| stored.matches(passphrase))
            .map(|(principal, _)| principal.clone())
    }

    fn passphrase_for(&self, principal: &str) -> Option<SecretString> {
        self.by_principal.get(principal).cloned()
    }
}
