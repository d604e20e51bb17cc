//
// Copyright (c) 2025 SOUNDVAULT LABS LLC
// This source code is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Project: soundvault — Secure audio ingest with envelope encryption.
//

//! Passphrase key derivation.
//!
//! PBKDF2-HMAC-SHA256 with 100 000 iterations over a 16-byte salt. The
//! parameters are part of the outer wire format: the client derives the same
//! key from the same passphrase and salt, so they must never drift.

use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;

use crate::secret::PassKey;
use crate::{KEY_LEN, PBKDF2_ITERATIONS, SALT_LEN};

/// Derive the outer-layer key from a passphrase and salt.
///
/// Deterministic: identical inputs produce a byte-identical key.
pub fn derive_key(passphrase: &str, salt: &[u8; SALT_LEN]) -> PassKey {
    let mut key = [0u8; KEY_LEN];
    pbkdf2_hmac::<Sha256>(passphrase.as_bytes(), salt, PBKDF2_ITERATIONS, &mut key);
    PassKey(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derivation_is_deterministic() {
        let salt = [7u8; SALT_LEN];
        let a = derive_key("hunter2", &salt);
        let b = derive_key("hunter2", &salt);
        assert_eq!(a.as_bytes(), b.as_bytes());
    }

    #[test]
    fn test_different_passphrases_differ() {
        let salt = [7u8; SALT_LEN];
        let a = derive_key("hunter2", &salt);
        let b = derive_key("hunter3", &salt);
        assert_ne!(a.as_bytes(), b.as_bytes());
    }

    #[test]
    fn test_different_salts_differ() {
        let a = derive_key("hunter2", &[1u8; SALT_LEN]);
        let b = derive_key("hunter2", &[2u8; SALT_LEN]);
        assert_ne!(a.as_bytes(), b.as_bytes());
    }
}
