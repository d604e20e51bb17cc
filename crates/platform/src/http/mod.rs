//
// Copyright (c) 2025 SOUNDVAULT LABS LLC
// This source code is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Project: soundvault — Secure audio ingest with envelope encryption.
//

//! Axum HTTP layer for the ingest service.

pub mod auth;
pub mod handlers;
pub mod router;
pub mod state;

pub use auth::SessionContext;
pub use router::create_router;
pub use state::AppState;
