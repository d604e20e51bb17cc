//
// Copyright (c) 2025 SOUNDVAULT LABS LLC
// This source code is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Project: soundvault — Secure audio ingest with envelope encryption.
//

//! Shared wire types for soundvault services.
//!
//! This crate provides the canonical definitions used across the ingest
//! service and the consumer worker: the envelope sidecar JSON, the upload
//! event payload, and the object-store key layout. All field names on the
//! wire are load-bearing — the sidecar and event formats are consumed by
//! deployments that predate this codebase, so serialized names must never
//! change (including the legacy `kek` field, which carries the *wrapped data
//! key*, not a key-encryption key).
//!
//! # Quick Start
//!
//! ```rust
//! use soundvault_types::prelude::*;
//! use uuid::Uuid;
//!
//! let principal = "alice@example.com";
//! let uuid = Uuid::new_v4();
//! let ciphertext_ref = ObjectKeys::ciphertext(principal, &uuid, "take-01.wav");
//! let envelope_ref = ObjectKeys::sidecar(principal, &uuid);
//! assert!(ciphertext_ref.ends_with(".enc"));
//! assert!(envelope_ref.ends_with("metadata.json"));
//! ```

pub mod event;
pub mod keys;
pub mod sidecar;

// Re-export primitive type aliases — direct re-exports, no newtype wrappers.
pub use chrono::{DateTime, Utc};
pub use uuid::Uuid;

/// Prelude module for convenient glob imports.
pub mod prelude {
    pub use crate::event::UploadEvent;
    pub use crate::keys::ObjectKeys;
    pub use crate::sidecar::{EnvelopeSidecar, VerificationStatus, SIDECAR_VERSION};
    pub use crate::{DateTime, Utc, Uuid};
}

/// Current time in milliseconds since the Unix epoch.
///
/// All persisted timestamps (sidecar `timestamp`, event `ts_ms`) use this
/// representation.
pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}
