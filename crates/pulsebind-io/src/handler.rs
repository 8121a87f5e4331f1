// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Feed message handlers

use async_trait::async_trait;
use pulsebind_config::IngestionConfig;
use pulsebind_services::{BindingService, ReceiveOutcome, ServiceError};
use std::sync::Arc;
use tracing::debug;

use crate::feed::FeedMessage;
use crate::message::SampleDataMessage;
use crate::{IngestError, Result};

/// What a handled message did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleOutcome {
    Stored,
    Duplicate,
}

impl From<ReceiveOutcome> for HandleOutcome {
    fn from(outcome: ReceiveOutcome) -> Self {
        match outcome {
            ReceiveOutcome::Stored => HandleOutcome::Stored,
            ReceiveOutcome::Duplicate => HandleOutcome::Duplicate,
        }
    }
}

/// Invoked by the consumer task for every feed message
#[async_trait]
pub trait MessageHandler: Send + Sync {
    async fn handle(&self, message: &FeedMessage) -> Result<HandleOutcome>;
}

/// Merges sample data messages into their records
///
/// A message that names an owner is always checked against the bound owner.
/// A message without one is accepted as coming from a trusted feed unless
/// `require_owner` is set, in which case it is rejected. Redelivery of the
/// stored payload is reported as [`HandleOutcome::Duplicate`].
pub struct SampleIngestionHandler {
    service: Arc<dyn BindingService>,
    require_owner: bool,
}

impl SampleIngestionHandler {
    pub fn new(service: Arc<dyn BindingService>, require_owner: bool) -> Self {
        Self {
            service,
            require_owner,
        }
    }

    pub fn from_config(service: Arc<dyn BindingService>, config: &IngestionConfig) -> Self {
        Self::new(service, config.require_owner)
    }
}

#[async_trait]
impl MessageHandler for SampleIngestionHandler {
    async fn handle(&self, message: &FeedMessage) -> Result<HandleOutcome> {
        let data = SampleDataMessage::decode(&message.payload)?;
        let sample_id = data.sample_id.trim();

        let outcome = match &data.owner {
            Some(owner) => {
                self.service
                    .receive_feed_data(sample_id, owner, &data.data)
                    .await?
            }
            None if self.require_owner => {
                return Err(IngestError::Service(ServiceError::Forbidden(format!(
                    "feed message for '{}' carries no owner",
                    sample_id
                ))));
            }
            None => self.service.receive_trusted_data(sample_id, &data.data).await?,
        };

        debug!(sample_id, ?outcome, bytes = data.data.len(), "feed payload merged");
        Ok(outcome.into())
    }
}
