// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Rendezvous and binding service trait
//!
//! A user registers a session id before the device has produced anything; the
//! device side (or record creation) later claims it and the sample is bound to
//! the registering owner. Data arriving for the sample is merged through
//! `receive_sample_data`.

use async_trait::async_trait;
use pulsebind_registry::{OwnerRef, RendezvousEntry};
use serde::{Deserialize, Serialize};

use crate::state_machine::{BindOutcome, ReceiveOutcome};
use crate::types::{Sample, ServiceResult};

/// Outcome of a successful claim
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimedSample {
    pub owner: OwnerRef,
    pub sample: Sample,
}

#[async_trait]
pub trait BindingService: Send + Sync {
    /// Claim a session for `owner` ahead of any data (409 if already pending)
    async fn register_rendezvous(
        &self,
        sample_id: &str,
        owner: OwnerRef,
    ) -> ServiceResult<RendezvousEntry>;

    /// Consume a pending rendezvous and bind the sample to its owner
    async fn claim_rendezvous(&self, sample_id: &str) -> ServiceResult<ClaimedSample>;

    async fn bind_sample(&self, sample_id: &str, owner: &OwnerRef) -> ServiceResult<BindOutcome>;

    /// Authenticated data receipt; always stores and refreshes the timestamp
    async fn receive_sample_data(
        &self,
        sample_id: &str,
        owner: &OwnerRef,
        payload: &[u8],
    ) -> ServiceResult<ReceiveOutcome>;

    /// Feed delivery naming its owner; redelivered payloads are `Duplicate`
    async fn receive_feed_data(
        &self,
        sample_id: &str,
        owner: &OwnerRef,
        payload: &[u8],
    ) -> ServiceResult<ReceiveOutcome>;

    /// Feed delivery from a trusted source (no owner check)
    async fn receive_trusted_data(
        &self,
        sample_id: &str,
        payload: &[u8],
    ) -> ServiceResult<ReceiveOutcome>;

    /// Owner of a bound sample (404 if missing, 409 if unbound)
    async fn sample_owner(&self, sample_id: &str) -> ServiceResult<OwnerRef>;

    async fn get_sample(&self, sample_id: &str) -> ServiceResult<Sample>;

    async fn samples_for_owner(&self, owner: &OwnerRef) -> ServiceResult<Vec<Sample>>;

    async fn classify_sample(&self, sample_id: &str, channel: i64) -> ServiceResult<Sample>;
}
