//
// Copyright (c) 2025 SOUNDVAULT LABS LLC
// This source code is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Project: soundvault — Secure audio ingest with envelope encryption.
//

//! Object store abstraction.
//!
//! Two concrete backends: [`S3ObjectStore`] for any S3-compatible service and
//! [`MemoryObjectStore`] for tests. Callers rely on read-after-write
//! consistency per key; listing immediately after a put may lag and must not
//! be used for correctness.

mod memory;
mod s3;

pub use memory::MemoryObjectStore;
pub use s3::S3ObjectStore;

use async_trait::async_trait;
use std::path::Path;
use tokio::io::AsyncRead;

use crate::error::ServiceError;

/// Opaque blob storage at deterministic keys.
///
/// All methods are safe for concurrent use through a shared handle.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Streaming upload of `length` bytes from a scratch file. Implementations
    /// must not buffer the whole object in memory.
    async fn put_stream(&self, key: &str, length: u64, path: &Path) -> Result<(), ServiceError>;

    /// Small-object upload (sidecars).
    async fn put_small(
        &self,
        key: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<(), ServiceError>;

    /// Streaming download.
    async fn get_stream(
        &self,
        key: &str,
    ) -> Result<Box<dyn AsyncRead + Send + Unpin>, ServiceError>;

    /// Whole-object download (sidecars).
    async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, ServiceError>;

    /// All keys under a prefix.
    async fn list(&self, prefix: &str) -> Result<Vec<String>, ServiceError>;

    /// Delete one key. Deleting a missing key is not an error.
    async fn delete(&self, key: &str) -> Result<(), ServiceError>;
}
