// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Binding service implementation
//!
//! Delegates session registration to the rendezvous registry and every record
//! mutation to the sample state machine.

use async_trait::async_trait;
use pulsebind_config::SamplesConfig;
use pulsebind_registry::{OwnerRef, RendezvousEntry, RendezvousRegistry};
use std::sync::Arc;
use tracing::{info, warn};

use crate::sample_id;
use crate::state_machine::{BindOutcome, ReceiveOutcome, SampleStateMachine};
use crate::store::RecordStore;
use crate::traits::binding_service::*;
use crate::types::{Sample, ServiceError, ServiceResult};

pub struct BindingServiceImpl {
    registry: Arc<RendezvousRegistry>,
    samples: SampleStateMachine,
}

impl BindingServiceImpl {
    pub fn new(registry: Arc<RendezvousRegistry>, samples: SampleStateMachine) -> Self {
        Self { registry, samples }
    }

    pub fn from_config(
        registry: Arc<RendezvousRegistry>,
        store: Arc<dyn RecordStore>,
        config: &SamplesConfig,
    ) -> Self {
        Self::new(registry, SampleStateMachine::from_config(store, config))
    }

    pub fn registry(&self) -> &Arc<RendezvousRegistry> {
        &self.registry
    }

    pub fn state_machine(&self) -> &SampleStateMachine {
        &self.samples
    }
}

fn accepted_id(sample_id: &str) -> ServiceResult<&str> {
    let id = sample_id.trim();
    if !sample_id::is_valid(id) {
        return Err(ServiceError::InvalidInput("sample_id is required".to_string()));
    }
    Ok(id)
}

#[async_trait]
impl BindingService for BindingServiceImpl {
    async fn register_rendezvous(
        &self,
        sample_id: &str,
        owner: OwnerRef,
    ) -> ServiceResult<RendezvousEntry> {
        let id = accepted_id(sample_id)?;
        Ok(self.registry.register_default(id, owner)?)
    }

    async fn claim_rendezvous(&self, sample_id: &str) -> ServiceResult<ClaimedSample> {
        let id = accepted_id(sample_id)?;
        let owner = self.registry.claim(id)?;

        // The entry is consumed at this point even if binding fails
        match self.samples.bind(id, &owner).await {
            Ok((outcome, sample)) => {
                info!(sample_id = %id, owner = %owner, ?outcome, "rendezvous completed");
                Ok(ClaimedSample { owner, sample })
            }
            Err(e) => {
                warn!(sample_id = %id, owner = %owner, "rendezvous claimed but bind failed: {}", e);
                Err(e)
            }
        }
    }

    async fn bind_sample(&self, sample_id: &str, owner: &OwnerRef) -> ServiceResult<BindOutcome> {
        let id = accepted_id(sample_id)?;
        let (outcome, _) = self.samples.bind(id, owner).await?;
        Ok(outcome)
    }

    async fn receive_sample_data(
        &self,
        sample_id: &str,
        owner: &OwnerRef,
        payload: &[u8],
    ) -> ServiceResult<ReceiveOutcome> {
        let id = accepted_id(sample_id)?;
        let (outcome, _) = self.samples.receive_data(id, owner, payload).await?;
        Ok(outcome)
    }

    async fn receive_feed_data(
        &self,
        sample_id: &str,
        owner: &OwnerRef,
        payload: &[u8],
    ) -> ServiceResult<ReceiveOutcome> {
        let id = accepted_id(sample_id)?;
        let (outcome, _) = self.samples.receive_from_feed(id, Some(owner), payload).await?;
        Ok(outcome)
    }

    async fn receive_trusted_data(
        &self,
        sample_id: &str,
        payload: &[u8],
    ) -> ServiceResult<ReceiveOutcome> {
        let id = accepted_id(sample_id)?;
        let (outcome, _) = self.samples.receive_trusted(id, payload).await?;
        Ok(outcome)
    }

    async fn sample_owner(&self, sample_id: &str) -> ServiceResult<OwnerRef> {
        let sample = self.get_sample(sample_id).await?;
        sample
            .owner
            .ok_or_else(|| ServiceError::Conflict(format!("sample '{}' is not bound", sample.id)))
    }

    async fn get_sample(&self, sample_id: &str) -> ServiceResult<Sample> {
        let id = accepted_id(sample_id)?;
        Ok(self.samples.store().get(id).await?)
    }

    async fn samples_for_owner(&self, owner: &OwnerRef) -> ServiceResult<Vec<Sample>> {
        Ok(self.samples.store().find_by_owner(owner).await?)
    }

    async fn classify_sample(&self, sample_id: &str, channel: i64) -> ServiceResult<Sample> {
        let id = accepted_id(sample_id)?;
        self.samples.classify(id, channel).await
    }
}
