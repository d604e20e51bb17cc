//
// Copyright (c) 2025 SOUNDVAULT LABS LLC
// This source code is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Project: soundvault — Secure audio ingest with envelope encryption.
//

//! Bounded retry with exponential backoff for transient store/stream calls.

use std::future::Future;
use std::time::Duration;
use tracing::warn;

use crate::error::ServiceError;

/// Maximum attempts for a transient operation.
pub const MAX_ATTEMPTS: u32 = 3;

/// Base delay doubled per attempt: 100ms, 200ms.
pub const BASE_DELAY: Duration = Duration::from_millis(100);

/// Run `op` up to [`MAX_ATTEMPTS`] times, backing off exponentially between
/// attempts. Only [`ServiceError::TransientIo`] failures are retried — every
/// other kind is returned immediately.
pub async fn with_backoff<T, F, Fut>(what: &str, mut op: F) -> Result<T, ServiceError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ServiceError>>,
{
    let mut delay = BASE_DELAY;
    let mut attempt = 1;

    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_transient() && attempt < MAX_ATTEMPTS => {
                warn!(what, attempt, error = %err, "transient failure, retrying");
                tokio::time::sleep(delay).await;
                delay *= 2;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}
