// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration type definitions
//!
//! This module defines all configuration structs that map to sections in
//! `pulsebind.toml`.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct PulsebindConfig {
    pub registry: RegistryConfig,
    pub samples: SamplesConfig,
    pub feed: FeedConfig,
    pub ingestion: IngestionConfig,
    pub logging: LoggingConfig,
}

/// Rendezvous registry configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Lifetime of an unclaimed rendezvous entry, in seconds
    pub rendezvous_ttl_secs: u64,
    /// Number of lock shards the registry spreads keys over
    pub shards: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            rendezvous_ttl_secs: 300,
            shards: 16,
        }
    }
}

impl RegistryConfig {
    pub fn rendezvous_ttl(&self) -> Duration {
        Duration::from_secs(self.rendezvous_ttl_secs)
    }
}

/// Sample record handling
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SamplesConfig {
    /// Read-modify-write attempts before a version conflict surfaces as a storage error
    pub max_update_attempts: u32,
}

impl Default for SamplesConfig {
    fn default() -> Self {
        Self {
            max_update_attempts: 5,
        }
    }
}

/// Feed transport selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedTransport {
    /// In-process channel (embedding, tests)
    Channel,
    /// ZeroMQ SUB socket
    Zmq,
    /// MQTT broker subscription
    Mqtt,
}

impl std::fmt::Display for FeedTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FeedTransport::Channel => write!(f, "channel"),
            FeedTransport::Zmq => write!(f, "zmq"),
            FeedTransport::Mqtt => write!(f, "mqtt"),
        }
    }
}

impl std::str::FromStr for FeedTransport {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "channel" => Ok(FeedTransport::Channel),
            "zmq" => Ok(FeedTransport::Zmq),
            "mqtt" => Ok(FeedTransport::Mqtt),
            _ => Err(format!("Invalid feed transport: {}", s)),
        }
    }
}

/// Inbound sensor feed configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FeedConfig {
    pub transport: FeedTransport,
    /// Publisher endpoint, e.g. `tcp://127.0.0.1:5570` (zmq only)
    pub endpoint: String,
    /// Topic the ingestion consumer subscribes to
    pub topic: String,
    /// Buffered messages per subscription before publishers wait
    pub channel_capacity: usize,
    /// Broker address, e.g. `tcp://127.0.0.1:1883` (mqtt only)
    pub broker: String,
    /// MQTT client identifier
    pub client_id: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            transport: FeedTransport::Channel,
            endpoint: String::new(),
            topic: "samples/data".to_string(),
            channel_capacity: 1024,
            broker: String::new(),
            client_id: "pulsebind".to_string(),
            username: None,
            password: None,
        }
    }
}

/// Ingestion adapter policy
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct IngestionConfig {
    /// Drop feed messages that do not name the owner of the target sample
    pub require_owner: bool,
    /// Upper bound on a single message handling, in milliseconds
    pub handler_timeout_ms: u64,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            require_owner: false,
            handler_timeout_ms: 5000,
        }
    }
}

impl IngestionConfig {
    pub fn handler_timeout(&self) -> Duration {
        Duration::from_millis(self.handler_timeout_ms)
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Text,
    Json,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default level (trace, debug, info, warn, error)
    pub level: String,
    pub format: LogFormat,
    /// Directory for rotated log files (file-logging feature); empty disables file output
    pub directory: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
            directory: String::new(),
        }
    }
}
