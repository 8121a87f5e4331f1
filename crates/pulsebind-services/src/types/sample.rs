// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Sample record model.

A sample is the durable record of one collection session: who owns it, which
device produced it, and the last payload received for it.
*/

use chrono::{DateTime, Utc};
use pulsebind_registry::OwnerRef;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::category::Category;

/// Lifecycle of a sample record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    /// Created by a device before any owner is known
    Unbound,
    /// Owner assigned, no data yet
    Bound,
    /// At least one payload stored; re-entered on every new payload
    DataReceived,
}

impl std::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LifecycleState::Unbound => write!(f, "unbound"),
            LifecycleState::Bound => write!(f, "bound"),
            LifecycleState::DataReceived => write!(f, "data_received"),
        }
    }
}

/// Durable collection record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sample {
    /// Session identifier (globally unique, immutable)
    pub id: String,
    /// Internal record identifier, assigned at creation
    pub sample_uuid: Uuid,
    pub owner: Option<OwnerRef>,
    /// Device that produced the session, derived from `id`
    pub device_ref: String,
    pub timestamp: DateTime<Utc>,
    pub payload: Vec<u8>,
    pub lifecycle_state: LifecycleState,
    pub category: Category,
    /// SHA-256 of `payload`, set once data has been received
    pub payload_digest: Option<[u8; 32]>,
    /// Optimistic-lock version, maintained by the record store
    pub version: u64,
}

impl Sample {
    /// New record with no owner and no data
    pub fn new(id: impl Into<String>, device_ref: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            sample_uuid: Uuid::new_v4(),
            owner: None,
            device_ref: device_ref.into(),
            timestamp,
            payload: Vec::new(),
            lifecycle_state: LifecycleState::Unbound,
            category: Category::Unknown,
            payload_digest: None,
            version: 0,
        }
    }

    pub fn is_bound(&self) -> bool {
        self.owner.is_some()
    }

    pub fn is_owned_by(&self, owner: &OwnerRef) -> bool {
        self.owner.as_ref() == Some(owner)
    }
}

/// Digest used to recognise redelivered payloads; stable across builds
pub fn payload_digest(payload: &[u8]) -> [u8; 32] {
    Sha256::digest(payload).into()
}
