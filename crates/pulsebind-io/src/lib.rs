// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Feed ingestion for pulsebind
//!
//! Sensor payloads arrive on a publish/subscribe feed as JSON messages naming
//! the target sample. A single consumer task per subscription decodes each
//! message and merges it into the sample through the binding service. Nothing
//! a message does (bad JSON, unknown sample, owner mismatch, slow store) stops
//! the consumer; it is logged, counted and dropped.
//!
//! Feeds:
//! - [`ChannelFeed`]: in-process, backed by tokio channels
//! - [`ZmqFeed`]: ZeroMQ SUB socket (feature `zmq-feed`)
//! - [`MqttFeed`]: MQTT broker subscription (feature `mqtt-feed`)

pub mod consumer;
pub mod feed;
pub mod handler;
pub mod message;

pub use consumer::{IngestionConsumer, IngestionStats, IngestionStatsSnapshot};
pub use feed::{ChannelFeed, FeedMessage, FeedSource, FeedSubscription};
#[cfg(feature = "mqtt-feed")]
pub use feed::MqttFeed;
#[cfg(feature = "zmq-feed")]
pub use feed::ZmqFeed;
pub use handler::{HandleOutcome, MessageHandler, SampleIngestionHandler};
pub use message::SampleDataMessage;

use pulsebind_services::ServiceError;

#[derive(Debug, Clone, thiserror::Error)]
pub enum IngestError {
    #[error("Malformed feed message: {0}")]
    Decode(String),

    #[error("Failed to encode feed message: {0}")]
    Encode(String),

    #[error(transparent)]
    Service(#[from] ServiceError),

    #[error("Message handling exceeded {0:?}")]
    Timeout(std::time::Duration),

    #[error("Feed error: {0}")]
    Feed(String),
}

pub type Result<T> = std::result::Result<T, IngestError>;
