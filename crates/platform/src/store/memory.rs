//
// Copyright (c) 2025 SOUNDVAULT LABS LLC
// This source code is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Project: soundvault — Secure audio ingest with envelope encryption.
//

//! In-memory object store for tests.
//!
//! Buffers objects in a map (the streaming contract is about the production
//! backend; tests trade that for determinism) and exposes a couple of
//! inspection helpers the integration suite uses to tamper with stored
//! bytes.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::io::Cursor;
use std::path::Path;
use tokio::io::AsyncRead;
use tokio::sync::RwLock;

use super::ObjectStore;
use crate::error::ServiceError;

#[derive(Default)]
pub struct MemoryObjectStore {
    objects: RwLock<BTreeMap<String, StoredObject>>,
}

struct StoredObject {
    content_type: String,
    bytes: Vec<u8>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored objects.
    pub async fn object_count(&self) -> usize {
        self.objects.read().await.len()
    }

    /// Raw stored bytes, for assertions.
    pub async fn raw(&self, key: &str) -> Option<Vec<u8>> {
        self.objects.read().await.get(key).map(|o| o.bytes.clone())
    }

    /// Overwrite stored bytes in place — the integration suite's tampering
    /// hook (bit flips, truncation).
    pub async fn corrupt(&self, key: &str, bytes: Vec<u8>) {
        if let Some(object) = self.objects.write().await.get_mut(key) {
            object.bytes = bytes;
        }
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn put_stream(&self, key: &str, length: u64, path: &Path) -> Result<(), ServiceError> {
        let bytes = tokio::fs::read(path).await?;
        if bytes.len() as u64 != length {
            return Err(ServiceError::format(format!(
                "declared length {length} but scratch file holds {}",
                bytes.len()
            )));
        }

        self.objects.write().await.insert(
            key.to_string(),
            StoredObject {
                content_type: "application/octet-stream".to_string(),
                bytes,
            },
        );
        Ok(())
    }

    async fn put_small(
        &self,
        key: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<(), ServiceError> {
        self.objects.write().await.insert(
            key.to_string(),
            StoredObject {
                content_type: content_type.to_string(),
                bytes,
            },
        );
        Ok(())
    }

    async fn get_stream(
        &self,
        key: &str,
    ) -> Result<Box<dyn AsyncRead + Send + Unpin>, ServiceError> {
        let bytes = self.get_bytes(key).await?;
        Ok(Box::new(Cursor::new(bytes)))
    }

    async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, ServiceError> {
        self.objects
            .read()
            .await
            .get(key)
            .map(|o| o.bytes.clone())
            .ok_or_else(|| ServiceError::NotFound(key.to_string()))
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>, ServiceError> {
        Ok(self
            .objects
            .read()
            .await
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }

    async fn delete(&self, key: &str) -> Result<(), ServiceError> {
        self.objects.write().await.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tokio::io::AsyncReadExt;

    #[tokio::test]
    async fn test_put_get_round_trip() {
        let store = MemoryObjectStore::new();
        store
            .put_small("a/b", "application/json", b"{}".to_vec())
            .await
            .unwrap();

        assert_eq!(store.get_bytes("a/b").await.unwrap(), b"{}");
        assert_eq!(
            store.objects.read().await.get("a/b").unwrap().content_type,
            "application/json"
        );
    }

    #[tokio::test]
    async fn test_put_stream_checks_length() {
        let store = MemoryObjectStore::new();
        let mut scratch = tempfile::NamedTempFile::new().unwrap();
        scratch.write_all(b"0123456789").unwrap();

        store.put_stream("k", 10, scratch.path()).await.unwrap();
        assert!(matches!(
            store.put_stream("k2", 11, scratch.path()).await,
            Err(ServiceError::Format(_))
        ));
    }

    #[tokio::test]
    async fn test_get_stream_reads_back() {
        let store = MemoryObjectStore::new();
        store
            .put_small("k", "application/octet-stream", vec![7u8; 100])
            .await
            .unwrap();

        let mut reader = store.get_stream("k").await.unwrap();
        let mut out = Vec::new();
        reader.read_to_end(&mut out).await.unwrap();
        assert_eq!(out, vec![7u8; 100]);
    }

    #[tokio::test]
    async fn test_missing_key_is_not_found() {
        let store = MemoryObjectStore::new();
        assert!(matches!(
            store.get_bytes("nope").await,
            Err(ServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_list_and_delete() {
        let store = MemoryObjectStore::new();
        store.put_small("p/1", "t", vec![1]).await.unwrap();
        store.put_small("p/2", "t", vec![2]).await.unwrap();
        store.put_small("q/3", "t", vec![3]).await.unwrap();

        assert_eq!(store.list("p/").await.unwrap(), vec!["p/1", "p/2"]);

        store.delete("p/1").await.unwrap();
        // Deleting a missing key is fine.
        store.delete("p/1").await.unwrap();
        assert_eq!(store.list("p/").await.unwrap(), vec!["p/2"]);
    }
}
