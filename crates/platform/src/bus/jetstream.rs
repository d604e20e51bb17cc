//
// Copyright (c) 2025 SOUNDVAULT LABS LLC
// This source code is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Project: soundvault — Secure audio ingest with envelope encryption.
//

//! JetStream event bus backend.
//!
//! Stream `FILE_UPLOADS` on subject `file.uploads`: file-backed storage,
//! limits retention with discard-old, 7-day max age. The durable pull
//! consumer `file_processor` uses explicit acks with a 30-second ack-wait;
//! workers share it and JetStream distributes messages among them.

use async_trait::async_trait;
use futures_util::StreamExt;
use std::time::Duration;
use tracing::info;

use async_nats::jetstream::{
    self,
    consumer::{pull, AckPolicy, PullConsumer},
    stream::{DiscardPolicy, RetentionPolicy, StorageType},
};
use soundvault_types::event::{CONSUMER_NAME, STREAM_NAME, SUBJECT};

use super::{AckHandle, Delivery, EventBus, ACK_WAIT, MAX_AGE};
use crate::error::ServiceError;

pub struct JetStreamEventBus {
    context: jetstream::Context,
    consumer: PullConsumer,
}

impl JetStreamEventBus {
    /// Connect and ensure the stream and durable consumer exist.
    ///
    /// Creation is idempotent, so the ingest server and every consumer
    /// worker can all call this at startup.
    pub async fn connect(url: &str) -> Result<Self, ServiceError> {
        let client = async_nats::connect(url).await.map_err(|e| {
            ServiceError::ConfigFatal(format!("event bus unreachable at {url}: {e}"))
        })?;

        let context = jetstream::new(client);

        let stream = context
            .get_or_create_stream(jetstream::stream::Config {
                name: STREAM_NAME.to_string(),
                subjects: vec![SUBJECT.to_string()],
                storage: StorageType::File,
                retention: RetentionPolicy::Limits,
                discard: DiscardPolicy::Old,
                max_age: MAX_AGE,
                ..Default::default()
            })
            .await
            .map_err(|e| ServiceError::ConfigFatal(format!("stream setup failed: {e}")))?;

        let consumer = stream
            .get_or_create_consumer(
                CONSUMER_NAME,
                pull::Config {
                    durable_name: Some(CONSUMER_NAME.to_string()),
                    ack_policy: AckPolicy::Explicit,
                    ack_wait: ACK_WAIT,
                    ..Default::default()
                },
            )
            .await
            .map_err(|e| ServiceError::ConfigFatal(format!("consumer setup failed: {e}")))?;

        info!(stream = STREAM_NAME, consumer = CONSUMER_NAME, "event bus ready");

        Ok(Self { context, consumer })
    }
}

#[async_trait]
impl EventBus for JetStreamEventBus {
    async fn publish(&self, payload: Vec<u8>) -> Result<(), ServiceError> {
        // Double await: the second one resolves the server's publish ack, so
        // an Ok return means the event is durably stored.
        self.context
            .publish(SUBJECT, payload.into())
            .await
            .map_err(|e| ServiceError::transient(format!("event publish: {e}")))?
            .await
            .map_err(|e| ServiceError::transient(format!("event publish ack: {e}")))?;

        Ok(())
    }

    async fn pull(&self, wait: Duration) -> Result<Option<Delivery>, ServiceError> {
        let mut batch = self
            .consumer
            .fetch()
            .max_messages(1)
            .expires(wait)
            .messages()
            .await
            .map_err(|e| ServiceError::transient(format!("event pull: {e}")))?;

        match batch.next().await {
            Some(Ok(message)) => {
                let payload = message.payload.clone();
                Ok(Some(Delivery::new(payload, Box::new(JetStreamAck { message }))))
            }
            Some(Err(e)) => Err(ServiceError::transient(format!("event pull: {e}"))),
            None => Ok(None),
        }
    }
}

struct JetStreamAck {
    message: jetstream::Message,
}

#[async_trait]
impl AckHandle for JetStreamAck {
    async fn ack(self: Box<Self>) -> Result<(), ServiceError> {
        self.message
            .ack()
            .await
            .map_err(|e| ServiceError::transient(format!("event ack: {e}")))
    }
}
