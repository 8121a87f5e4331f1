// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! ZeroMQ SUB feed
//!
//! Connects a SUB socket to a publisher and forwards received messages into
//! the subscription buffer from a reader task. Publishers send either
//! `[topic, payload]` or a single `[payload]` frame; single-frame messages are
//! attributed to the subscribed topic.
//!
//! The socket subscribes to everything: ZeroMQ filters on the first frame, which
//! for a single-frame message is the payload itself. Two-frame messages are
//! filtered here by topic prefix instead.

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing::{debug, info, warn};
use zeromq::{Socket, SocketRecv, SubSocket, ZmqMessage};

use super::{FeedMessage, FeedSource, FeedSubscription};
use crate::{IngestError, Result};

const CONNECT_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(5);

pub struct ZmqFeed {
    endpoint: String,
    capacity: usize,
}

impl ZmqFeed {
    pub fn new(endpoint: impl Into<String>, capacity: usize) -> Self {
        Self {
            endpoint: endpoint.into(),
            capacity: capacity.max(1),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl FeedSource for ZmqFeed {
    async fn subscribe(&self, topic: &str) -> Result<FeedSubscription> {
        let mut socket = SubSocket::new();

        timeout(CONNECT_TIMEOUT, socket.connect(&self.endpoint))
            .await
            .map_err(|_| IngestError::Feed(format!("connect to {} timed out", self.endpoint)))?
            .map_err(|e| IngestError::Feed(format!("connect to {} failed: {}", self.endpoint, e)))?;
        socket
            .subscribe("")
            .await
            .map_err(|e| IngestError::Feed(format!("subscribe to '{}' failed: {}", topic, e)))?;

        info!("[ZMQ-FEED] Subscribed to '{}' on {}", topic, self.endpoint);

        let (sender, receiver) = mpsc::channel(self.capacity);
        let reader = tokio::spawn(read_loop(socket, topic.to_string(), sender));

        Ok(FeedSubscription::new(topic, receiver, Some(reader)))
    }

    fn transport_name(&self) -> &str {
        "zmq"
    }
}

async fn read_loop(mut socket: SubSocket, topic: String, sender: mpsc::Sender<FeedMessage>) {
    loop {
        let message = match socket.recv().await {
            Ok(message) => message,
            Err(e) => {
                warn!("[ZMQ-FEED] Receive failed on '{}', closing subscription: {}", topic, e);
                break;
            }
        };

        let Some(message) = split_frames(message, &topic) else {
            continue;
        };
        if sender.send(message).await.is_err() {
            debug!("[ZMQ-FEED] Subscription for '{}' dropped", topic);
            break;
        }
    }
}

fn split_frames(message: ZmqMessage, topic: &str) -> Option<FeedMessage> {
    let mut frames = message.into_vec();
    match frames.len() {
        1 => Some(FeedMessage::new(topic, frames.remove(0).to_vec())),
        2 => {
            if !frames[0].starts_with(topic.as_bytes()) {
                return None;
            }
            let payload = frames.remove(1).to_vec();
            let topic = String::from_utf8_lossy(&frames[0]).into_owned();
            Some(FeedMessage::new(topic, payload))
        }
        n => {
            warn!("[ZMQ-FEED] Dropping message with {} frames on '{}'", n, topic);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use zeromq::{PubSocket, SocketSend};

    #[test]
    fn test_split_frames() {
        let single = ZmqMessage::from("payload");
        assert_eq!(
            split_frames(single, "samples/data"),
            Some(FeedMessage::new("samples/data", b"payload".to_vec()))
        );

        let mut pair = ZmqMessage::from("samples/data");
        pair.push_back("body".into());
        assert_eq!(
            split_frames(pair, "samples"),
            Some(FeedMessage::new("samples/data", b"body".to_vec()))
        );

        let mut foreign = ZmqMessage::from("other/topic");
        foreign.push_back("body".into());
        assert_eq!(split_frames(foreign, "samples/data"), None);
    }

    #[tokio::test]
    async fn test_live_single_and_two_frame_delivery() {
        let mut publisher = PubSocket::new();
        let endpoint = publisher.bind("tcp://127.0.0.1:0").await.unwrap();
        let feed = ZmqFeed::new(endpoint.to_string(), 64);
        let mut subscription = feed.subscribe("samples/data").await.unwrap();

        let mut single_received = false;
        let mut framed_received = false;
        // SUB joins asynchronously; keep publishing until both shapes arrive
        for _ in 0..100 {
            publisher
                .send(ZmqMessage::from(r#"{"sample_id":"S1","data":[1]}"#))
                .await
                .unwrap();
            let mut foreign = ZmqMessage::from("other/topic");
            foreign.push_back("ignored".into());
            publisher.send(foreign).await.unwrap();
            let mut framed = ZmqMessage::from("samples/data");
            framed.push_back("framed".into());
            publisher.send(framed).await.unwrap();

            while let Ok(Some(message)) =
                timeout(Duration::from_millis(20), subscription.next()).await
            {
                assert_eq!(message.topic, "samples/data");
                assert_ne!(message.payload, b"ignored".to_vec());
                if message.payload == b"framed".to_vec() {
                    framed_received = true;
                } else {
                    assert!(message.payload.starts_with(b"{"));
                    single_received = true;
                }
            }
            if single_received && framed_received {
                break;
            }
        }

        assert!(single_received, "single-frame message never delivered");
        assert!(framed_received, "two-frame message never delivered");
    }

    #[tokio::test]
    async fn test_connect_to_unreachable_endpoint_fails() {
        let feed = ZmqFeed::new("not-an-endpoint", 4);
        assert!(matches!(
            feed.subscribe("samples/data").await,
            Err(IngestError::Feed(_))
        ));
    }
}
