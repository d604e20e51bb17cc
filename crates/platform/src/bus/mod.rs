//
// Copyright (c) 2025 SOUNDVAULT LABS LLC
// This source code is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Project: soundvault — Secure audio ingest with envelope encryption.
//

//! Durable event stream abstraction.
//!
//! The delivery contract is at-least-once with explicit acknowledgment: a
//! pulled message that is not acked becomes eligible for redelivery after
//! the ack-wait window. Publishing either fully persists the event or fails —
//! there is no partial visibility.

mod jetstream;
mod memory;

pub use jetstream::JetStreamEventBus;
pub use memory::MemoryEventBus;

use async_trait::async_trait;
use bytes::Bytes;
use std::time::Duration;

use crate::error::ServiceError;

/// Default ack-wait: a pulled message not acked within this window is
/// redelivered.
pub const ACK_WAIT: Duration = Duration::from_secs(30);

/// Default wait for a pull with no message available.
pub const PULL_WAIT: Duration = Duration::from_secs(5);

/// Event retention: 7 days.
pub const MAX_AGE: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Durable append-only stream with a shared pull consumer.
#[async_trait]
pub trait EventBus: Send + Sync {
    /// Publish an event. Returns only once the stream has durably accepted
    /// it.
    async fn publish(&self, payload: Vec<u8>) -> Result<(), ServiceError>;

    /// Pull the next message for the durable consumer, waiting up to `wait`.
    /// `None` means no message arrived inside the window.
    async fn pull(&self, wait: Duration) -> Result<Option<Delivery>, ServiceError>;
}

/// One in-flight message. Dropping it without calling [`Delivery::ack`]
/// leaves the message unacked; the stream redelivers it after ack-wait.
pub struct Delivery {
    pub payload: Bytes,
    acker: Box<dyn AckHandle>,
}

impl Delivery {
    pub fn new(payload: Bytes, acker: Box<dyn AckHandle>) -> Self {
        Self { payload, acker }
    }

    /// Acknowledge successful processing.
    pub async fn ack(self) -> Result<(), ServiceError> {
        self.acker.ack().await
    }
}

/// Backend-specific acknowledgment hook.
#[async_trait]
pub trait AckHandle: Send {
    async fn ack(self: Box<Self>) -> Result<(), ServiceError>;
}
