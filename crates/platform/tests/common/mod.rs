//
// Copyright (c) 2025 SOUNDVAULT LABS LLC
// This source code is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Project: soundvault — Secure audio ingest with envelope encryption.
//

//! Shared test harness: memory-backed pipelines, a client-side encryptor,
//! a recording sink, and failure-injecting wrappers for atomicity tests.

#![allow(dead_code)]

use async_trait::async_trait;
use std::io::{Cursor, Seek, SeekFrom, Write};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use soundvault_core::{encrypt_outer_stream, MasterKey};
use soundvault_platform::bus::{Delivery, EventBus, MemoryEventBus};
use soundvault_platform::consumer::{ConsumerPipeline, PlaintextSink, ProcessingMeta};
use soundvault_platform::credentials::MemoryCredentialStore;
use soundvault_platform::error::ServiceError;
use soundvault_platform::http::AppState;
use soundvault_platform::ingest::IngestPipeline;
use soundvault_platform::listing::ListingApi;
use soundvault_platform::session::SessionRegistry;
use soundvault_platform::store::{MemoryObjectStore, ObjectStore};

pub const MASTER_KEY_BYTE: u8 = 0x11;
pub const BUCKET: &str = "soundvault-test";

pub struct Harness {
    pub store: Arc<MemoryObjectStore>,
    pub bus: Arc<MemoryEventBus>,
    pub credentials: Arc<MemoryCredentialStore>,
    pub master_key: Arc<MasterKey>,
    pub pipeline: Arc<IngestPipeline>,
    pub listing: Arc<ListingApi>,
}

impl Harness {
    /// Harness with `alice@example.com` / `hunter2` registered and the
    /// master key fixed to 32 bytes of 0x11.
    pub fn new() -> Self {
        Self::with_credentials([(
            "alice@example.com".to_string(),
            "hunter2".to_string(),
        )])
    }

    pub fn with_credentials(pairs: impl IntoIterator<Item = (String, String)>) -> Self {
        let store = Arc::new(MemoryObjectStore::new());
        let bus = Arc::new(MemoryEventBus::new());
        let credentials = Arc::new(MemoryCredentialStore::new(pairs));
        let master_key = Arc::new(MasterKey::from_bytes([MASTER_KEY_BYTE; 32]));

        let pipeline = Arc::new(IngestPipeline::new(
            store.clone(),
            bus.clone(),
            credentials.clone(),
            master_key.clone(),
            BUCKET.to_string(),
        ));
        let listing = Arc::new(ListingApi::new(store.clone()));

        Self {
            store,
            bus,
            credentials,
            master_key,
            pipeline,
            listing,
        }
    }

    /// Consumer against this harness's store and bus with the given sink.
    pub fn consumer(&self, sink: Arc<dyn PlaintextSink>) -> ConsumerPipeline {
        ConsumerPipeline::new(
            self.store.clone(),
            self.bus.clone(),
            self.master_key.clone(),
            sink,
        )
    }

    /// HTTP state over this harness (30-minute sessions).
    pub fn app_state(&self, max_upload_bytes: u64) -> AppState {
        AppState {
            pipeline: self.pipeline.clone(),
            listing: self.listing.clone(),
            sessions: SessionRegistry::new(Duration::from_secs(1800)),
            credentials: self.credentials.clone(),
            max_upload_bytes,
        }
    }
}

/// Encrypt plaintext the way the browser client does and spool it to a
/// scratch file, ready to hand to the ingest pipeline.
pub fn client_encrypt_to_file(plaintext: &[u8], passphrase: &str) -> std::fs::File {
    let mut sealed = Vec::new();
    encrypt_outer_stream(&mut Cursor::new(plaintext), &mut sealed, passphrase)
        .expect("client-side encryption cannot fail in tests");

    let mut file = tempfile::tempfile().expect("scratch file");
    file.write_all(&sealed).expect("scratch write");
    file.seek(SeekFrom::Start(0)).expect("scratch rewind");
    file
}

/// Client-encrypted bytes, for tests that build multipart bodies.
pub fn client_encrypt_to_vec(plaintext: &[u8], passphrase: &str) -> Vec<u8> {
    let mut sealed = Vec::new();
    encrypt_outer_stream(&mut Cursor::new(plaintext), &mut sealed, passphrase)
        .expect("client-side encryption cannot fail in tests");
    sealed
}

/// Sink that records every delivery (meta + plaintext bytes) in memory.
#[derive(Default)]
pub struct CollectSink {
    deliveries: Mutex<Vec<(ProcessingMeta, Vec<u8>)>>,
}

impl CollectSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn deliveries(&self) -> Vec<(ProcessingMeta, Vec<u8>)> {
        self.deliveries
            .lock()
            .unwrap()
            .iter()
            .map(|(meta, bytes)| (meta.clone(), bytes.clone()))
            .collect()
    }

    pub fn delivery_count(&self) -> usize {
        self.deliveries.lock().unwrap().len()
    }
}

#[async_trait]
impl PlaintextSink for CollectSink {
    async fn deliver(&self, meta: &ProcessingMeta, plaintext: &Path) -> Result<(), ServiceError> {
        let bytes = tokio::fs::read(plaintext).await?;
        self.deliveries
            .lock()
            .unwrap()
            .push((meta.clone(), bytes));
        Ok(())
    }
}

/// Store wrapper that can be told to fail sidecar writes — the atomicity
/// fault injector.
pub struct FailingStore {
    pub inner: Arc<MemoryObjectStore>,
    pub fail_put_small: AtomicBool,
}

impl FailingStore {
    pub fn wrap(inner: Arc<MemoryObjectStore>) -> Arc<Self> {
        Arc::new(Self {
            inner,
            fail_put_small: AtomicBool::new(false),
        })
    }
}

#[async_trait]
impl ObjectStore for FailingStore {
    async fn put_stream(&self, key: &str, length: u64, path: &Path) -> Result<(), ServiceError> {
        self.inner.put_stream(key, length, path).await
    }

    async fn put_small(
        &self,
        key: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<(), ServiceError> {
        if self.fail_put_small.load(Ordering::SeqCst) {
            return Err(ServiceError::transient("injected sidecar failure"));
        }
        self.inner.put_small(key, content_type, bytes).await
    }

    async fn get_stream(
        &self,
        key: &str,
    ) -> Result<Box<dyn tokio::io::AsyncRead + Send + Unpin>, ServiceError> {
        self.inner.get_stream(key).await
    }

    async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, ServiceError> {
        self.inner.get_bytes(key).await
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>, ServiceError> {
        self.inner.list(prefix).await
    }

    async fn delete(&self, key: &str) -> Result<(), ServiceError> {
        self.inner.delete(key).await
    }
}

/// Bus wrapper that can be told to fail publishes.
pub struct FailingBus {
    pub inner: Arc<MemoryEventBus>,
    pub fail_publish: AtomicBool,
}

impl FailingBus {
    pub fn wrap(inner: Arc<MemoryEventBus>) -> Arc<Self> {
        Arc::new(Self {
            inner,
            fail_publish: AtomicBool::new(false),
        })
    }
}

#[async_trait]
impl EventBus for FailingBus {
    async fn publish(&self, payload: Vec<u8>) -> Result<(), ServiceError> {
        if self.fail_publish.load(Ordering::SeqCst) {
            return Err(ServiceError::transient("injected publish failure"));
        }
        self.inner.publish(payload).await
    }

    async fn pull(&self, wait: Duration) -> Result<Option<Delivery>, ServiceError> {
        self.inner.pull(wait).await
    }
}
