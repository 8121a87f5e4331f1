// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Process-level wiring
//!
//! Owns the rendezvous registry, the binding service and the ingestion
//! consumer for one configured feed topic.

use pulsebind_config::{validate_config, ConfigError, FeedConfig, FeedTransport, PulsebindConfig};
use pulsebind_io::{
    ChannelFeed, FeedSource, IngestError, IngestionConsumer, IngestionStatsSnapshot,
    SampleIngestionHandler,
};
use pulsebind_observability::{init_logging, parse_debug_flags, LoggingGuard};
use pulsebind_registry::{RegistryError, RendezvousRegistry};
use pulsebind_services::{BindingService, BindingServiceImpl, RecordStore, ServiceError};
use std::sync::Arc;
use tracing::info;

#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error(transparent)]
    Service(#[from] ServiceError),

    #[error("Logging initialisation failed: {0}")]
    Logging(String),

    #[error("Feed transport '{0}' is not available in this build")]
    UnsupportedTransport(FeedTransport),
}

pub struct PulsebindRuntime {
    config: PulsebindConfig,
    registry: Arc<RendezvousRegistry>,
    service: Arc<BindingServiceImpl>,
    consumer: IngestionConsumer,
}

impl PulsebindRuntime {
    /// Validate `config`, build the core and subscribe to the feed topic
    ///
    /// Must be called from within a tokio runtime.
    pub async fn start(
        config: PulsebindConfig,
        store: Arc<dyn RecordStore>,
        feed: &dyn FeedSource,
    ) -> Result<Self, RuntimeError> {
        validate_config(&config)?;

        let registry = Arc::new(RendezvousRegistry::from_config(&config.registry)?);
        let service = Arc::new(BindingServiceImpl::from_config(
            Arc::clone(&registry),
            store,
            &config.samples,
        ));

        let subscription = feed.subscribe(&config.feed.topic).await?;
        let handler = SampleIngestionHandler::from_config(
            Arc::clone(&service) as Arc<dyn BindingService>,
            &config.ingestion,
        );
        let consumer = IngestionConsumer::spawn(
            subscription,
            Arc::new(handler),
            config.ingestion.handler_timeout(),
        );

        info!(
            "Pulsebind runtime started (feed={}, topic={}, ttl={:?}, require_owner={})",
            feed.transport_name(),
            config.feed.topic,
            config.registry.rendezvous_ttl(),
            config.ingestion.require_owner
        );

        Ok(Self {
            config,
            registry,
            service,
            consumer,
        })
    }

    pub fn config(&self) -> &PulsebindConfig {
        &self.config
    }

    pub fn service(&self) -> Arc<BindingServiceImpl> {
        Arc::clone(&self.service)
    }

    pub fn registry(&self) -> Arc<RendezvousRegistry> {
        Arc::clone(&self.registry)
    }

    pub fn ingestion_stats(&self) -> IngestionStatsSnapshot {
        self.consumer.stats()
    }

    pub fn is_ingesting(&self) -> bool {
        self.consumer.is_running()
    }

    /// Stop ingestion, then the registry's expiry scheduler
    pub async fn shutdown(self) {
        self.consumer.shutdown().await;
        self.registry.shutdown();
        info!("Pulsebind runtime stopped");
    }
}

/// Install the global tracing subscriber from `logging` config and `--debug-*` flags
///
/// Keep the returned guard alive for the lifetime of the process.
pub fn init_observability(config: &PulsebindConfig) -> Result<LoggingGuard, RuntimeError> {
    let flags = parse_debug_flags();
    init_logging(&flags, &config.logging).map_err(|e| RuntimeError::Logging(e.to_string()))
}

/// Build the feed named by `config`
///
/// A `channel` feed returned here has no publisher outside the process; embedders
/// that publish in-process construct a [`ChannelFeed`] themselves and keep a clone.
pub fn feed_from_config(config: &FeedConfig) -> Result<Box<dyn FeedSource>, RuntimeError> {
    match config.transport {
        FeedTransport::Channel => Ok(Box::new(ChannelFeed::new(config.channel_capacity))),
        #[cfg(feature = "zmq-feed")]
        FeedTransport::Zmq => Ok(Box::new(pulsebind_io::ZmqFeed::new(
            config.endpoint.clone(),
            config.channel_capacity,
        ))),
        #[cfg(not(feature = "zmq-feed"))]
        FeedTransport::Zmq => Err(RuntimeError::UnsupportedTransport(FeedTransport::Zmq)),
        #[cfg(feature = "mqtt-feed")]
        FeedTransport::Mqtt => Ok(Box::new(pulsebind_io::MqttFeed::from_config(config))),
        #[cfg(not(feature = "mqtt-feed"))]
        FeedTransport::Mqtt => Err(RuntimeError::UnsupportedTransport(FeedTransport::Mqtt)),
    }
}
