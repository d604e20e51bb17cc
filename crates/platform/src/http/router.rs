//
// Copyright (c) 2025 SOUNDVAULT LABS LLC
// This source code is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Project: soundvault — Secure audio ingest with envelope encryption.
//

//! Axum router composition for the ingest HTTP layer.
//!
//! Routes:
//!   POST    /api/validate-passphrase  — passphrase login (no session)
//!   POST    /api/upload               — multipart upload (session)
//!   GET     /api/files                — list objects (session)
//!   DELETE  /api/files                — delete object (session)
//!   POST    /api/logout               — destroy session (session)
//!   GET     /healthz                  — health check

use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use super::auth::session_auth;
use super::handlers::{
    delete_file_handler, health_handler, list_files_handler, logout_handler, upload_handler,
    validate_passphrase_handler,
};
use super::state::AppState;

/// Slack on top of the upload cap for multipart framing and the small text
/// fields; the handler enforces the exact file-size cap itself.
const BODY_LIMIT_SLACK: usize = 1024 * 1024;

/// Compose the full Axum router for the ingest service.
pub fn create_router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/api/upload", post(upload_handler))
        .route(
            "/api/files",
            get(list_files_handler).delete(delete_file_handler),
        )
        .route("/api/logout", post(logout_handler))
        .layer(middleware::from_fn_with_state(state.clone(), session_auth));

    Router::new()
        .route("/api/validate-passphrase", post(validate_passphrase_handler))
        .route("/healthz", get(health_handler))
        .merge(protected)
        .layer(DefaultBodyLimit::max(
            state.max_upload_bytes as usize + BODY_LIMIT_SLACK,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
