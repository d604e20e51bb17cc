//
// Copyright (c) 2025 SOUNDVAULT LABS LLC
// This source code is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Project: soundvault — Secure audio ingest with envelope encryption.
//

//! AppState — shared state for the ingest HTTP layer.
//!
//! Everything here is an `Arc` handle constructed once at startup: the
//! pipelines, the session registry, and the credential store. Cloning the
//! state per request is pointer bumps only.

use std::sync::Arc;

use crate::credentials::CredentialStore;
use crate::ingest::IngestPipeline;
use crate::listing::ListingApi;
use crate::session::SessionRegistry;

/// Shared application state for the HTTP layer.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<IngestPipeline>,
    pub listing: Arc<ListingApi>,
    pub sessions: Arc<SessionRegistry>,
    pub credentials: Arc<dyn CredentialStore>,
    /// Hard cap on the uploaded (outer) blob size in bytes.
    pub max_upload_bytes: u64,
}
