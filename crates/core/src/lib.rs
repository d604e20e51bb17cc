//
// Copyright (c) 2025 SOUNDVAULT LABS LLC
// This source code is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Project: soundvault — Secure audio ingest with envelope encryption.
//

//! # Soundvault Core
//!
//! Pure cryptographic core for the soundvault ingest pipeline. No network, no
//! store handles, no logging of secrets — just authenticated streaming
//! encryption and key wrapping over `std::io` readers and writers.
//!
//! ## Key Features
//!
//! - **Streaming AES-256-GCM**: single-tag output under bounded memory; chunk
//!   size never affects the produced bytes
//! - **Two-layer pipeline support**: the passphrase-derived outer layer
//!   (`salt || nonce || ciphertext || tag`) and the data-key inner layer
//!   (`nonce || ciphertext || tag`)
//! - **Envelope key wrapping**: per-object data keys wrapped under a
//!   long-lived master key, 60 bytes / 80 base64 chars on the wire
//! - **PBKDF2-HMAC-SHA256 derivation**: 100 000 iterations, 16-byte salt
//! - **Memory Safety**: data keys, derived keys, and the master key zeroize
//!   on drop
//!
//! ## Quick Start
//!
//! ```rust
//! use soundvault_core::{decrypt_inner_stream, encrypt_inner_stream};
//! use std::io::Cursor;
//!
//! # fn main() -> Result<(), soundvault_core::CoreError> {
//! let plaintext = b"forty-two seconds of audio";
//! let mut ciphertext = Vec::new();
//! let summary = encrypt_inner_stream(&mut Cursor::new(&plaintext[..]), &mut ciphertext)?;
//!
//! let mut recovered = Vec::new();
//! decrypt_inner_stream(&mut Cursor::new(&ciphertext), &mut recovered, &summary.data_key)?;
//! assert_eq!(recovered, plaintext);
//! # Ok(())
//! # }
//! ```

/// AES-GCM nonce length in bytes.
pub const NONCE_LEN: usize = 12;

/// AES-GCM authentication tag length in bytes.
pub const TAG_LEN: usize = 16;

/// PBKDF2 salt length in bytes (outer layer).
pub const SALT_LEN: usize = 16;

/// Symmetric key length in bytes (AES-256).
pub const KEY_LEN: usize = 32;

/// PBKDF2-HMAC-SHA256 iteration count for passphrase-derived keys.
pub const PBKDF2_ITERATIONS: u32 = 100_000;

/// Streaming chunk size. Internal only — the produced bytes are identical for
/// any chunk size because the GCM tag appears exactly once at stream end.
pub const CHUNK_SIZE: usize = 8 * 1024;

/// Decoded length of a wrapped data key: nonce(12) || key(32) || tag(16).
pub const WRAPPED_KEY_LEN: usize = NONCE_LEN + KEY_LEN + TAG_LEN;

pub mod envelope;
pub mod error;
mod gcm;
pub mod kdf;
pub mod secret;
pub mod stream;

pub use envelope::{unwrap_data_key, wrap_data_key};
pub use error::CoreError;
pub use kdf::derive_key;
pub use secret::{DataKey, MasterKey, PassKey, SecretString};
pub use stream::{
    decrypt_inner_stream, decrypt_outer_stream, encrypt_inner_stream, encrypt_outer_stream,
    InnerSummary, OuterSummary,
};
