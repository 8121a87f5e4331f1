// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Record store interface
//!
//! Persistence of sample records is external; this module defines the
//! contract the state machine relies on and an in-memory implementation.

use async_trait::async_trait;
use parking_lot::RwLock;
use pulsebind_registry::OwnerRef;
use std::collections::HashMap;

use crate::types::Sample;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Record already exists: {0}")]
    Conflict(String),

    #[error("Version conflict: expected {expected}, found {actual}")]
    VersionConflict { expected: u64, actual: u64 },

    #[error("Store backend error: {0}")]
    Backend(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Durable keyed storage for sample records
///
/// `update` must be atomic with respect to `expected_version`: it succeeds only
/// if the stored record still carries that version, and the store then bumps
/// the version.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn get(&self, id: &str) -> StoreResult<Sample>;

    /// Insert a new record; returns it with the version assigned by the store
    async fn create(&self, sample: Sample) -> StoreResult<Sample>;

    /// Replace a record if its stored version equals `expected_version`
    async fn update(&self, sample: Sample, expected_version: u64) -> StoreResult<Sample>;

    async fn find_by_owner(&self, owner: &OwnerRef) -> StoreResult<Vec<Sample>>;
}

/// In-memory record store
#[derive(Default)]
pub struct InMemoryRecordStore {
    records: RwLock<HashMap<String, Sample>>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn get(&self, id: &str) -> StoreResult<Sample> {
        self.records
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn create(&self, mut sample: Sample) -> StoreResult<Sample> {
        let mut records = self.records.write();
        if records.contains_key(&sample.id) {
            return Err(StoreError::Conflict(sample.id));
        }
        sample.version = 1;
        records.insert(sample.id.clone(), sample.clone());
        Ok(sample)
    }

    async fn update(&self, mut sample: Sample, expected_version: u64) -> StoreResult<Sample> {
        let mut records = self.records.write();
        let stored = records
            .get_mut(&sample.id)
            .ok_or_else(|| StoreError::NotFound(sample.id.clone()))?;

        if stored.version != expected_version {
            return Err(StoreError::VersionConflict {
                expected: expected_version,
                actual: stored.version,
            });
        }

        sample.version = expected_version + 1;
        *stored = sample.clone();
        Ok(sample)
    }

    async fn find_by_owner(&self, owner: &OwnerRef) -> StoreResult<Vec<Sample>> {
        let mut samples: Vec<Sample> = self
            .records
            .read()
            .values()
            .filter(|sample| sample.is_owned_by(owner))
            .cloned()
            .collect();
        samples.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(samples)
    }
}
