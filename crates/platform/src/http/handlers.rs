//
// Copyright (c) 2025 SOUNDVAULT LABS LLC
// This source code is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Project: soundvault — Secure audio ingest with envelope encryption.
//

//! HTTP endpoint handlers for the ingest service.
//!
//! Error bodies are short and generic — the interesting detail goes to
//! structured logs. In particular every authentication failure, whatever its
//! cause, is the byte-identical body from [`unauthorized_response`].

use axum::extract::{Extension, Multipart, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::io::AsyncWriteExt;
use tracing::warn;
use uuid::Uuid;

use super::auth::SessionContext;
use super::state::AppState;
use crate::credentials::CredentialStore;
use crate::error::ServiceError;
use crate::listing::ObjectRecord;

// ---------------------------------------------------------------------------
// Error mapping
// ---------------------------------------------------------------------------

/// The one true 401 body. Wrong passphrase, unknown principal, missing or
/// expired session — all byte-identical.
pub fn unauthorized_response() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "error": "invalid credentials" })),
    )
        .into_response()
}

/// Handler-level error wrapper mapping the service taxonomy to HTTP.
pub struct ApiError(ServiceError);

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self.0 {
            ServiceError::Auth => unauthorized_response(),
            ServiceError::Format(detail) => {
                warn!(%detail, "rejecting malformed request");
                (
                    StatusCode::BAD_REQUEST,
                    Json(json!({ "error": "invalid request" })),
                )
                    .into_response()
            }
            ServiceError::NotFound(_) => (
                StatusCode::NOT_FOUND,
                Json(json!({ "error": "not found" })),
            )
                .into_response(),
            ServiceError::Capacity(detail) => {
                warn!(%detail, "rejecting oversized request");
                (
                    StatusCode::PAYLOAD_TOO_LARGE,
                    Json(json!({ "error": "payload too large" })),
                )
                    .into_response()
            }
            ServiceError::TransientIo(detail) | ServiceError::ConfigFatal(detail) => {
                warn!(%detail, "request failed on server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "internal error" })),
                )
                    .into_response()
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: String,
}

/// GET /healthz — service health probe.
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "OK".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now().to_rfc3339(),
    })
}

// ---------------------------------------------------------------------------
// Session endpoints
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct ValidatePassphraseRequest {
    pub passphrase: String,
}

#[derive(Serialize)]
pub struct ValidatePassphraseResponse {
    pub validated: bool,
    pub token: String,
}

/// POST /api/validate-passphrase — passphrase login, issues a session token.
pub async fn validate_passphrase_handler(
    State(state): State<AppState>,
    Json(request): Json<ValidatePassphraseRequest>,
) -> Result<Json<ValidatePassphraseResponse>, ApiError> {
    let principal = state
        .credentials
        .validate_passphrase(&request.passphrase)
        .ok_or(ServiceError::Auth)?;

    let token = state.sessions.create_session(&principal).await;

    Ok(Json(ValidatePassphraseResponse {
        validated: true,
        token,
    }))
}

/// POST /api/logout — destroy the presented session.
pub async fn logout_handler(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
) -> Json<serde_json::Value> {
    state.sessions.destroy_session(&session.token).await;
    Json(json!({ "logged_out": true }))
}

// ---------------------------------------------------------------------------
// Upload
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct UploadResponse {
    pub object_id: Uuid,
    pub verification_status: String,
}

/// POST /api/upload — multipart `{file, email, passphrase}`.
///
/// The file field is spooled to an anonymous scratch file as it streams in;
/// nothing of the body is held in memory beyond one multipart chunk. The
/// size cap is enforced against the spooled byte count so a 413 is exact,
/// not an artifact of framing overhead.
pub async fn upload_handler(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let mut email: Option<String> = None;
    let mut passphrase: Option<String> = None;
    let mut upload: Option<(String, std::fs::File)> = None;

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| ServiceError::format(format!("multipart: {e}")))?
    {
        let field_name = field.name().map(str::to_string);
        match field_name.as_deref() {
            Some("email") => {
                email = Some(
                    field
                        .text()
                        .await
                        .map_err(|e| ServiceError::format(format!("email field: {e}")))?,
                );
            }
            Some("passphrase") => {
                passphrase = Some(
                    field
                        .text()
                        .await
                        .map_err(|e| ServiceError::format(format!("passphrase field: {e}")))?,
                );
            }
            Some("file") => {
                let original_name = field
                    .file_name()
                    .map(str::to_string)
                    .ok_or_else(|| ServiceError::format("file field has no filename"))?;

                let scratch = tempfile::tempfile().map_err(ServiceError::from)?;
                let mut writer = tokio::fs::File::from_std(scratch);
                let mut written: u64 = 0;

                while let Some(chunk) = field
                    .chunk()
                    .await
                    .map_err(|e| ServiceError::format(format!("file field: {e}")))?
                {
                    written += chunk.len() as u64;
                    if written > state.max_upload_bytes {
                        return Err(ServiceError::Capacity(format!(
                            "upload exceeds {} bytes",
                            state.max_upload_bytes
                        ))
                        .into());
                    }
                    writer.write_all(&chunk).await.map_err(ServiceError::from)?;
                }
                writer.flush().await.map_err(ServiceError::from)?;

                upload = Some((original_name, writer.into_std().await));
            }
            _ => {
                // Unknown fields are drained and ignored.
            }
        }
    }

    let email = non_empty(email, "email")?;
    let passphrase = non_empty(passphrase, "passphrase")?;
    let (original_name, blob) =
        upload.ok_or_else(|| ServiceError::format("missing field: file"))?;

    // The email field must name the principal this session belongs to.
    if email != session.principal {
        return Err(ServiceError::Auth.into());
    }

    let outcome = state
        .pipeline
        .ingest(&email, &passphrase, &original_name, blob)
        .await?;

    Ok(Json(UploadResponse {
        object_id: outcome.object_id,
        verification_status: outcome.verification_status.as_str().to_string(),
    }))
}

fn non_empty(value: Option<String>, field: &str) -> Result<String, ServiceError> {
    match value {
        Some(v) if !v.is_empty() => Ok(v),
        Some(_) => Err(ServiceError::format(format!("empty field: {field}"))),
        None => Err(ServiceError::format(format!("missing field: {field}"))),
    }
}

// ---------------------------------------------------------------------------
// Listing and deletion
// ---------------------------------------------------------------------------

/// GET /api/files — the authenticated principal's objects.
pub async fn list_files_handler(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
) -> Result<Json<Vec<ObjectRecord>>, ApiError> {
    let records = state.listing.list_objects(&session.principal).await?;
    Ok(Json(records))
}

#[derive(Deserialize)]
pub struct DeleteParams {
    pub object_id: Uuid,
    pub original_name: String,
}

/// DELETE /api/files?object_id=…&original_name=…
///
/// Idempotent at the HTTP level: deleting an object that does not exist
/// still returns 200, with the miss noted in the body.
pub async fn delete_file_handler(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
    Query(params): Query<DeleteParams>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let found = state
        .listing
        .delete_object(&session.principal, &params.object_id, &params.original_name)
        .await?;

    if found {
        Ok(Json(json!({ "deleted": true })))
    } else {
        Ok(Json(json!({ "deleted": false, "note": "not found" })))
    }
}
