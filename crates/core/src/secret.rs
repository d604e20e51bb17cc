//
// Copyright (c) 2025 SOUNDVAULT LABS LLC
// This source code is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Project: soundvault — Secure audio ingest with envelope encryption.
//

//! Secret types the pipeline passes around.
//!
//! [`SecretString`] holds textual credentials (passphrases, backend secret
//! keys). It zeroizes on drop, redacts `Debug`, and deliberately has no
//! `PartialEq`/`Display`/`Serialize`: the only comparison it offers is
//! [`SecretString::matches`], which runs in constant time so a passphrase
//! check cannot leak how far the candidate got.
//!
//! The three fixed-width key newtypes — [`DataKey`] (fresh per object),
//! [`MasterKey`] (loaded once at startup), and [`PassKey`] (PBKDF2 output) —
//! zeroize on drop and redact their `Debug` output the same way.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use rand_core::{OsRng, RngCore};
use std::fmt;
use subtle::ConstantTimeEq;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::{error::CoreError, KEY_LEN};

/// An owned secret string: a passphrase or a backend credential.
///
/// # Usage
///
/// ```rust
/// use soundvault_core::SecretString;
///
/// let registered = SecretString::new("hunter2");
///
/// // The only supported comparison is constant-time.
/// assert!(registered.matches("hunter2"));
/// assert!(!registered.matches("hunter3"));
///
/// // Debug output is always redacted.
/// assert!(format!("{:?}", registered).contains("[REDACTED]"));
/// ```
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SecretString(String);

impl SecretString {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Constant-time comparison against a candidate.
    ///
    /// Unequal lengths fail without inspecting the bytes; for equal lengths
    /// the comparison touches every byte regardless of where they differ.
    pub fn matches(&self, candidate: &str) -> bool {
        self.0.as_bytes().ct_eq(candidate.as_bytes()).into()
    }

    /// Expose the raw value — for handing to backends that need it (e.g.
    /// object-store clients). The caller is responsible for not leaking the
    /// returned reference: do not log it or store it in non-zeroizing types.
    pub fn reveal(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretString([REDACTED])")
    }
}

/// Fresh 32-byte symmetric key generated per Object.
///
/// Exists only between `encrypt_inner_stream` and `wrap_data_key` on the
/// ingest side, and between `unwrap_data_key` and `decrypt_inner_stream` on
/// the consumer side. Zeroized on drop; never serialized.
#[derive(Zeroize, ZeroizeOnDrop, PartialEq)]
pub struct DataKey([u8; KEY_LEN]);

impl DataKey {
    /// Generate a fresh data key from the OS CSPRNG.
    pub fn generate() -> Self {
        let mut bytes = [0u8; KEY_LEN];
        OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

impl fmt::Debug for DataKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DataKey([REDACTED])")
    }
}

/// Long-lived 32-byte key used only to wrap and unwrap data keys.
///
/// Loaded once from configuration at startup and shared read-only across all
/// workers.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct MasterKey([u8; KEY_LEN]);

impl MasterKey {
    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self(bytes)
    }

    /// Parse the configured `MASTER_KEY` value: base64 of exactly 32 bytes.
    pub fn from_base64(encoded: &str) -> Result<Self, CoreError> {
        let mut decoded = BASE64
            .decode(encoded.trim())
            .map_err(|_| CoreError::format("master key is not valid base64"))?;

        if decoded.len() != KEY_LEN {
            decoded.zeroize();
            return Err(CoreError::format(format!(
                "master key decodes to {} bytes, expected {KEY_LEN}",
                decoded.len()
            )));
        }

        let mut bytes = [0u8; KEY_LEN];
        bytes.copy_from_slice(&decoded);
        decoded.zeroize();
        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

impl fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("MasterKey([REDACTED])")
    }
}

/// 32-byte key derived from a passphrase via PBKDF2 (the outer layer key).
#[derive(Zeroize, ZeroizeOnDrop, PartialEq)]
pub struct PassKey(pub(crate) [u8; KEY_LEN]);

impl PassKey {
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

impl fmt::Debug for PassKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PassKey([REDACTED])")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matches_exact_value_only() {
        let secret = SecretString::new("hunter2");
        assert!(secret.matches("hunter2"));
        assert!(!secret.matches("hunter3"));
        assert!(!secret.matches("hunter2 "));
        assert!(!secret.matches(""));
    }

    /// Prefixes and extensions must fail — the comparison covers the whole
    /// value, not a leading fragment.
    #[test]
    fn test_matches_rejects_prefix_and_suffix() {
        let secret = SecretString::new("correct horse battery staple");
        assert!(!secret.matches("correct horse"));
        assert!(!secret.matches("correct horse battery staple!"));
    }

    #[test]
    fn test_secret_string_debug_redacted() {
        let secret = SecretString::new("my-secret");
        let output = format!("{:?}", secret);
        assert!(
            output.contains("[REDACTED]"),
            "Debug output should contain [REDACTED], got: {output}"
        );
        assert!(
            !output.contains("my-secret"),
            "Debug output must NOT contain the secret value, got: {output}"
        );
    }

    #[test]
    fn test_reveal_and_clone() {
        let secret = SecretString::new("value");
        assert_eq!(secret.reveal(), "value");

        let cloned = secret.clone();
        assert!(cloned.matches("value"));
    }

    #[test]
    fn test_key_debug_redacted() {
        let dk = DataKey::generate();
        assert_eq!(format!("{:?}", dk), "DataKey([REDACTED])");

        let mk = MasterKey::from_bytes([0x11; KEY_LEN]);
        assert_eq!(format!("{:?}", mk), "MasterKey([REDACTED])");
    }

    #[test]
    fn test_data_keys_are_distinct() {
        let a = DataKey::generate();
        let b = DataKey::generate();
        assert_ne!(a.as_bytes(), b.as_bytes());
    }

    #[test]
    fn test_master_key_from_base64_round_trip() {
        let raw = [0x42u8; KEY_LEN];
        let encoded = BASE64.encode(raw);
        let key = MasterKey::from_base64(&encoded).unwrap();
        assert_eq!(key.as_bytes(), &raw);
    }

    #[test]
    fn test_master_key_rejects_wrong_length() {
        let short = BASE64.encode([0u8; 16]);
        assert!(matches!(
            MasterKey::from_base64(&short),
            Err(CoreError::Format(_))
        ));
    }

    #[test]
    fn test_master_key_rejects_bad_base64() {
        assert!(matches!(
            MasterKey::from_base64("!!not base64!!"),
            Err(CoreError::Format(_))
        ));
    }

    #[test]
    fn test_zeroize_works() {
        let mut bytes = [42u8; KEY_LEN];
        bytes.zeroize();
        assert_eq!(bytes, [0u8; KEY_LEN]);
    }
}
