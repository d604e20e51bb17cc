//
// Copyright (c) 2025 SOUNDVAULT LABS LLC
// This source code is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Project: soundvault — Secure audio ingest with envelope encryption.
//

//! Session token authentication middleware.
//!
//! `session_auth` validates the `Authorization: Bearer <token>` header
//! against the in-process session registry and injects [`SessionContext`]
//! into request extensions. Every rejection — missing header, malformed
//! header, unknown token, expired session — produces the same generic 401
//! body, so callers cannot probe which part failed.

use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;

use super::handlers::unauthorized_response;
use super::state::AppState;

/// Authenticated session identity injected into request extensions.
#[derive(Clone)]
pub struct SessionContext {
    pub principal: String,
    /// The presented token — kept so logout can destroy its own session.
    pub token: String,
}

pub async fn session_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, Response> {
    let token = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|header| header.to_str().ok())
        .and_then(|header| header.strip_prefix("Bearer "))
        .ok_or_else(unauthorized_response)?;

    let principal = state
        .sessions
        .validate_session(token)
        .await
        .ok_or_else(unauthorized_response)?;

    let context = SessionContext {
        principal,
        token: token.to_string(),
    };
    request.extensions_mut().insert(context);

    Ok(next.run(request).await)
}
