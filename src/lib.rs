// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Pulsebind
//!
//! Rendezvous binding and sensor-payload ingestion for data-collection
//! sessions. A user claims a session id before the collecting device has
//! produced any data; the claim binds the session's sample record to that
//! user, and payloads arriving later on a publish/subscribe feed are merged
//! into the record.
//!
//! ## Quick Start
//!
//! ```toml
//! [dependencies]
//! pulsebind = "0.1"  # Default: ZeroMQ and MQTT feed support
//! ```
//!
//! ## Feature Flags
//! - **`zmq-feed`** (default): ZeroMQ SUB feed
//! - **`mqtt-feed`** (default): MQTT broker feed
//! - **`file-logging`**: daily-rotated JSON log files
//!
//! ## Usage
//!
//! ```rust,no_run
//! use pulsebind::prelude::*;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), pulsebind::RuntimeError> {
//! let config = PulsebindConfig::default();
//! let _logging = pulsebind::init_observability(&config)?;
//! let feed = ChannelFeed::new(config.feed.channel_capacity);
//! let runtime =
//!     PulsebindRuntime::start(config, Arc::new(InMemoryRecordStore::new()), &feed).await?;
//!
//! let service = runtime.service();
//! service
//!     .register_rendezvous("DEV1-2024-01-02-10-30-00-X", OwnerRef::new("user-a"))
//!     .await?;
//! # Ok(())
//! # }
//! ```

// Re-export components
pub use pulsebind_config as config;
pub use pulsebind_io as io;
pub use pulsebind_observability as observability;
pub use pulsebind_registry as registry;
pub use pulsebind_services as services;

pub mod runtime;

pub use runtime::{feed_from_config, init_observability, PulsebindRuntime, RuntimeError};

/// Prelude - commonly used types and traits
pub mod prelude {
    pub use crate::config::{load_config, PulsebindConfig};
    pub use crate::io::{ChannelFeed, FeedSource, IngestionStatsSnapshot};
    pub use crate::registry::{OwnerRef, RendezvousEntry, RendezvousRegistry};
    pub use crate::runtime::{PulsebindRuntime, RuntimeError};
    pub use crate::services::{
        BindOutcome, BindingService, InMemoryRecordStore, LifecycleState, ReceiveOutcome,
        RecordStore, Sample, ServiceError,
    };
}
