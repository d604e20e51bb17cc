//
// Copyright (c) 2025 SOUNDVAULT LABS LLC
// This source code is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Project: soundvault — Secure audio ingest with envelope encryption.
//

//! Error taxonomy for the crypto core.
//!
//! Every failure is fatal to the operation that raised it: there is no
//! partially authenticated output. Messages never contain key material or
//! plaintext bytes.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    /// Authentication tag mismatch: wrong key, wrong passphrase, or tampered
    /// bytes. Deliberately carries no detail.
    #[error("authentication failed")]
    AuthFailure,

    /// Malformed input layout: truncated header, bad base64, wrong wrapped
    /// key length, and similar structural defects.
    #[error("malformed input: {0}")]
    Format(String),

    /// Underlying reader/writer failure.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl CoreError {
    pub(crate) fn format(msg: impl Into<String>) -> Self {
        CoreError::Format(msg.into())
    }
}
