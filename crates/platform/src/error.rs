//
// Copyright (c) 2025 SOUNDVAULT LABS LLC
// This source code is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Project: soundvault — Secure audio ingest with envelope encryption.
//

//! Unified error taxonomy for the platform services.
//!
//! Every failure a pipeline can raise folds into one of six kinds; the HTTP
//! layer maps kinds to status codes and the consumer maps them all to
//! no-ack. Messages surfaced to clients stay short and generic — full
//! context (principal, object_id, kind) goes to structured logs, never key
//! bytes, never plaintext.

use soundvault_core::CoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServiceError {
    /// Wrong passphrase, unknown principal, bad session, or a GCM tag
    /// mismatch. Deliberately detail-free: callers cannot distinguish which.
    #[error("authentication failed")]
    Auth,

    /// Malformed input: bad multipart fields, unparseable sidecar or event
    /// JSON, broken wire layouts.
    #[error("malformed input: {0}")]
    Format(String),

    /// Missing object, sidecar, or API resource.
    #[error("not found: {0}")]
    NotFound(String),

    /// Store/stream glitch that may succeed on retry. Surfaced only after
    /// bounded retries are exhausted.
    #[error("transient io: {0}")]
    TransientIo(String),

    /// Body too large or store quota exceeded.
    #[error("capacity exceeded: {0}")]
    Capacity(String),

    /// Unusable configuration at startup. The process exits non-zero.
    #[error("fatal configuration error: {0}")]
    ConfigFatal(String),
}

impl ServiceError {
    pub fn format(msg: impl Into<String>) -> Self {
        ServiceError::Format(msg.into())
    }

    pub fn transient(msg: impl Into<String>) -> Self {
        ServiceError::TransientIo(msg.into())
    }

    /// True when a bounded retry is worth attempting.
    pub fn is_transient(&self) -> bool {
        matches!(self, ServiceError::TransientIo(_))
    }
}

impl From<CoreError> for ServiceError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::AuthFailure => ServiceError::Auth,
            CoreError::Format(msg) => ServiceError::Format(msg),
            CoreError::Io(e) => ServiceError::TransientIo(e.to_string()),
        }
    }
}

impl From<std::io::Error> for ServiceError {
    fn from(err: std::io::Error) -> Self {
        ServiceError::TransientIo(err.to_string())
    }
}
