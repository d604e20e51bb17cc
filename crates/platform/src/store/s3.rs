//
// Copyright (c) 2025 SOUNDVAULT LABS LLC
// This source code is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Project: soundvault — Secure audio ingest with envelope encryption.
//

//! S3-compatible object store backend.
//!
//! Works against AWS S3 and any S3-compatible service via a custom endpoint
//! with force-path-style addressing. Credentials are static, from service
//! configuration; the client handle is cheap to clone and safe to share.

use async_trait::async_trait;
use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::error::SdkError;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use std::path::Path;
use tokio::io::AsyncRead;
use tracing::warn;

use super::ObjectStore;
use crate::config::ObjectStoreConfig;
use crate::error::ServiceError;

pub struct S3ObjectStore {
    client: Client,
    bucket: String,
}

impl S3ObjectStore {
    /// Build a store handle from service configuration.
    pub async fn connect(cfg: &ObjectStoreConfig) -> Result<Self, ServiceError> {
        let credentials = Credentials::new(
            cfg.access_key.clone(),
            cfg.secret_key.reveal().to_string(),
            None,
            None,
            "soundvault-config",
        );

        let shared = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(Region::new(cfg.region.clone()))
            .credentials_provider(credentials)
            .load()
            .await;

        let mut builder = aws_sdk_s3::config::Builder::from(&shared).force_path_style(true);
        if let Some(endpoint) = &cfg.endpoint {
            builder = builder.endpoint_url(endpoint);
        }

        Ok(Self {
            client: Client::from_conf(builder.build()),
            bucket: cfg.bucket.clone(),
        })
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

/// Map an SDK failure, treating "no such key" as NotFound and the rest as
/// transient (the retry layer decides whether to try again).
fn map_get_error<E>(key: &str, err: SdkError<E>) -> ServiceError
where
    E: std::error::Error + aws_sdk_s3::error::ProvideErrorMetadata + 'static,
{
    if let SdkError::ServiceError(ref service_err) = err {
        let code = aws_sdk_s3::error::ProvideErrorMetadata::code(service_err.err());
        if matches!(code, Some("NoSuchKey") | Some("NotFound")) {
            return ServiceError::NotFound(key.to_string());
        }
    }
    ServiceError::transient(format!("object store: {err}"))
}

fn map_put_error<E: std::error::Error + 'static>(err: SdkError<E>) -> ServiceError {
    ServiceError::transient(format!("object store: {err}"))
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn put_stream(&self, key: &str, length: u64, path: &Path) -> Result<(), ServiceError> {
        let body = ByteStream::read_from()
            .path(path)
            .build()
            .await
            .map_err(|e| ServiceError::transient(format!("scratch read: {e}")))?;

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_length(length as i64)
            .body(body)
            .send()
            .await
            .map_err(map_put_error)?;

        Ok(())
    }

    async fn put_small(
        &self,
        key: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<(), ServiceError> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(bytes))
            .send()
            .await
            .map_err(map_put_error)?;

        Ok(())
    }

    async fn get_stream(
        &self,
        key: &str,
    ) -> Result<Box<dyn AsyncRead + Send + Unpin>, ServiceError> {
        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| map_get_error(key, e))?;

        Ok(Box::new(output.body.into_async_read()))
    }

    async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, ServiceError> {
        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| map_get_error(key, e))?;

        let data = output
            .body
            .collect()
            .await
            .map_err(|e| ServiceError::transient(format!("object store read: {e}")))?;

        Ok(data.into_bytes().to_vec())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>, ServiceError> {
        let mut keys = Vec::new();
        let mut pages = self
            .client
            .list_objects_v2()
            .bucket(&self.bucket)
            .prefix(prefix)
            .into_paginator()
            .send();

        while let Some(page) = pages.next().await {
            let page = page.map_err(|e| ServiceError::transient(format!("object list: {e}")))?;
            for object in page.contents() {
                if let Some(key) = object.key() {
                    keys.push(key.to_string());
                }
            }
        }

        Ok(keys)
    }

    async fn delete(&self, key: &str) -> Result<(), ServiceError> {
        // S3 delete is idempotent — deleting a missing key succeeds.
        if let Err(e) = self
            .client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            warn!(key, error = %e, "object delete failed");
            return Err(ServiceError::transient(format!("object delete: {e}")));
        }
        Ok(())
    }
}
