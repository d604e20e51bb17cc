//
// Copyright (c) 2025 SOUNDVAULT LABS LLC
// This source code is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Project: soundvault — Secure audio ingest with envelope encryption.
//

//! Envelope key wrapping.
//!
//! The per-object data key is sealed under the long-lived master key with
//! one-shot AES-256-GCM and a fresh nonce per wrap. Wire form, base64-encoded
//! into the sidecar's `kek` field:
//!
//! ```text
//! nonce(12) || AES-GCM(master_key, nonce, data_key)(32) || tag(16)   = 60 bytes
//! ```

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use rand_core::{OsRng, RngCore};
use zeroize::Zeroize;

use crate::secret::{DataKey, MasterKey};
use crate::{CoreError, KEY_LEN, NONCE_LEN, WRAPPED_KEY_LEN};

/// Wrap a data key under the master key. Returns the 80-char base64 form.
///
/// A fresh nonce is drawn per wrap, so wrapping the same data key twice
/// yields different ciphertexts — master-key nonces never repeat.
pub fn wrap_data_key(data_key: &DataKey, master_key: &MasterKey) -> Result<String, CoreError> {
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(master_key.as_bytes()));

    let mut nonce = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce);

    let sealed = cipher
        .encrypt(Nonce::from_slice(&nonce), data_key.as_bytes().as_slice())
        .map_err(|_| CoreError::format("data key wrap failed"))?;

    let mut out = Vec::with_capacity(WRAPPED_KEY_LEN);
    out.extend_from_slice(&nonce);
    out.extend_from_slice(&sealed);
    debug_assert_eq!(out.len(), WRAPPED_KEY_LEN);

    Ok(BASE64.encode(out))
}

/// Unwrap a base64-encoded wrapped data key.
///
/// Fails with [`CoreError::Format`] when the encoding or length is wrong and
/// [`CoreError::AuthFailure`] on any tag mismatch (wrong master key or
/// tampered bytes).
pub fn unwrap_data_key(wrapped_b64: &str, master_key: &MasterKey) -> Result<DataKey, CoreError> {
    let raw = BASE64
        .decode(wrapped_b64)
        .map_err(|_| CoreError::format("wrapped key is not valid base64"))?;

    if raw.len() != WRAPPED_KEY_LEN {
        return Err(CoreError::format(format!(
            "wrapped key is {} bytes, expected {WRAPPED_KEY_LEN}",
            raw.len()
        )));
    }

    let (nonce, sealed) = raw.split_at(NONCE_LEN);
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(master_key.as_bytes()));

    let mut plain = cipher
        .decrypt(Nonce::from_slice(nonce), sealed)
        .map_err(|_| CoreError::AuthFailure)?;

    let mut bytes = [0u8; KEY_LEN];
    bytes.copy_from_slice(&plain);
    plain.zeroize();

    Ok(DataKey::from_bytes(bytes))
}
