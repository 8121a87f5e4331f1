// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! In-process feed over tokio channels

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, trace};

use super::{FeedMessage, FeedSource, FeedSubscription};
use crate::{IngestError, Result};

/// Topic fan-out to bounded tokio channels
///
/// Cloning yields another handle to the same feed. `publish` waits while a
/// subscriber's buffer is full; subscribers that went away are pruned.
#[derive(Clone)]
pub struct ChannelFeed {
    capacity: usize,
    subscribers: Arc<Mutex<HashMap<String, Vec<mpsc::Sender<FeedMessage>>>>>,
}

impl ChannelFeed {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            subscribers: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Deliver `payload` to every live subscriber of `topic`
    ///
    /// Returns the number of subscribers reached.
    pub async fn publish(&self, topic: &str, payload: impl Into<Vec<u8>>) -> Result<usize> {
        let senders = self
            .subscribers
            .lock()
            .get(topic)
            .cloned()
            .unwrap_or_default();

        let message = FeedMessage::new(topic, payload);
        let mut delivered = 0;
        for sender in &senders {
            if sender.send(message.clone()).await.is_ok() {
                delivered += 1;
            }
        }

        if delivered < senders.len() {
            self.prune(topic);
        }
        trace!(topic, delivered, "channel feed publish");
        Ok(delivered)
    }

    /// Close every subscription so consumers see the end of the feed
    pub fn close(&self) {
        self.subscribers.lock().clear();
        debug!("channel feed closed");
    }

    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.subscribers
            .lock()
            .get(topic)
            .map(|senders| senders.iter().filter(|s| !s.is_closed()).count())
            .unwrap_or(0)
    }

    fn prune(&self, topic: &str) {
        let mut subscribers = self.subscribers.lock();
        if let Some(senders) = subscribers.get_mut(topic) {
            senders.retain(|sender| !sender.is_closed());
            if senders.is_empty() {
                subscribers.remove(topic);
            }
        }
    }
}

#[async_trait]
impl FeedSource for ChannelFeed {
    async fn subscribe(&self, topic: &str) -> Result<FeedSubscription> {
        if topic.is_empty() {
            return Err(IngestError::Feed("topic cannot be empty".to_string()));
        }
        let (sender, receiver) = mpsc::channel(self.capacity);
        self.subscribers
            .lock()
            .entry(topic.to_string())
            .or_default()
            .push(sender);
        debug!(topic, "channel feed subscription added");
        Ok(FeedSubscription::new(topic, receiver, None))
    }

    fn transport_name(&self) -> &str {
        "channel"
    }
}
