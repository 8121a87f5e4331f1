// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Publish/subscribe feed abstraction

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::Result;

mod channel;
#[cfg(feature = "mqtt-feed")]
mod mqtt;
#[cfg(feature = "zmq-feed")]
mod zmq;

pub use channel::ChannelFeed;
#[cfg(feature = "mqtt-feed")]
pub use mqtt::MqttFeed;
#[cfg(feature = "zmq-feed")]
pub use zmq::ZmqFeed;

/// One raw message delivered by a feed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedMessage {
    pub topic: String,
    pub payload: Vec<u8>,
}

impl FeedMessage {
    pub fn new(topic: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
        }
    }
}

/// Source of feed subscriptions
#[async_trait]
pub trait FeedSource: Send + Sync {
    async fn subscribe(&self, topic: &str) -> Result<FeedSubscription>;

    /// Short name used in logs
    fn transport_name(&self) -> &str;
}

/// Stream of messages for one topic
///
/// Ends (`next` returns `None`) when the feed closes. Dropping the
/// subscription stops any background reader attached to it.
pub struct FeedSubscription {
    topic: String,
    receiver: mpsc::Receiver<FeedMessage>,
    reader: Option<JoinHandle<()>>,
}

impl FeedSubscription {
    pub(crate) fn new(
        topic: impl Into<String>,
        receiver: mpsc::Receiver<FeedMessage>,
        reader: Option<JoinHandle<()>>,
    ) -> Self {
        Self {
            topic: topic.into(),
            receiver,
            reader,
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub async fn next(&mut self) -> Option<FeedMessage> {
        self.receiver.recv().await
    }
}

impl Drop for FeedSubscription {
    fn drop(&mut self) {
        if let Some(reader) = self.reader.take() {
            reader.abort();
        }
    }
}
