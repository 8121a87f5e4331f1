// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Sample lifecycle state machine.

```text
            bind                 receive_data
 Unbound ─────────▶ Bound ─────────────────▶ DataReceived ◀─┐
    │                                            │          │ receive_data
    └──────────────── receive_data ─────────────▶└──────────┘
```

Every transition is a read-modify-write against the record store, guarded by
the record version. A version conflict means another writer (a request handler
or the ingestion consumer) got there first; the transition is re-applied to the
fresh record, up to `max_update_attempts` times.
*/

use chrono::Utc;
use pulsebind_config::SamplesConfig;
use pulsebind_registry::OwnerRef;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::category::classify_channel;
use crate::sample_id;
use crate::store::{RecordStore, StoreError};
use crate::types::{payload_digest, LifecycleState, Sample, ServiceError, ServiceResult};

/// Result of a successful `bind`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindOutcome {
    /// No record existed; one was created already bound
    Created,
    /// An unbound record was assigned its owner
    Bound,
    /// The record was already bound to the same owner
    AlreadyBound,
}

/// Result of a successful data receipt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiveOutcome {
    Stored,
    /// Feed redelivery of the payload already stored; record left untouched
    Duplicate,
}

enum Step<T> {
    Write(T),
    Keep(T),
}

pub struct SampleStateMachine {
    store: Arc<dyn RecordStore>,
    max_update_attempts: u32,
}

impl SampleStateMachine {
    pub fn new(store: Arc<dyn RecordStore>, max_update_attempts: u32) -> Self {
        Self {
            store,
            max_update_attempts: max_update_attempts.max(1),
        }
    }

    pub fn from_config(store: Arc<dyn RecordStore>, config: &SamplesConfig) -> Self {
        Self::new(store, config.max_update_attempts)
    }

    pub fn store(&self) -> &Arc<dyn RecordStore> {
        &self.store
    }

    /// Associate a sample with its owner, creating the record if needed
    pub async fn bind(&self, id: &str, owner: &OwnerRef) -> ServiceResult<(BindOutcome, Sample)> {
        for _ in 0..self.max_update_attempts {
            match self.modify(id, |sample| bind_existing(sample, owner)).await {
                Err(ServiceError::NotFound { .. }) => {}
                other => return other,
            }

            let mut sample = new_record(id)?;
            sample.owner = Some(owner.clone());
            sample.lifecycle_state = LifecycleState::Bound;

            match self.store.create(sample).await {
                Ok(saved) => {
                    info!(sample_id = %id, owner = %owner, "sample created bound");
                    return Ok((BindOutcome::Created, saved));
                }
                Err(StoreError::Conflict(_)) => {
                    debug!(sample_id = %id, "sample created concurrently; binding existing record");
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(self.exhausted(id))
    }

    /// Store a payload sent on behalf of `owner`
    ///
    /// Fails `Forbidden` if the record is bound to someone else. Always writes:
    /// a resubmitted payload refreshes the timestamp.
    pub async fn receive_data(
        &self,
        id: &str,
        owner: &OwnerRef,
        payload: &[u8],
    ) -> ServiceResult<(ReceiveOutcome, Sample)> {
        ensure_payload(payload)?;
        self.modify(id, |sample| {
            check_owner(sample, owner)?;
            Ok(apply_payload(sample, payload, false))
        })
        .await
    }

    /// Store a payload delivered by the feed, checking `owner` when given
    ///
    /// A payload identical to the stored one is reported as `Duplicate` and
    /// leaves the record untouched.
    pub async fn receive_from_feed(
        &self,
        id: &str,
        owner: Option<&OwnerRef>,
        payload: &[u8],
    ) -> ServiceResult<(ReceiveOutcome, Sample)> {
        ensure_payload(payload)?;
        self.modify(id, |sample| {
            if let Some(owner) = owner {
                check_owner(sample, owner)?;
            }
            Ok(apply_payload(sample, payload, true))
        })
        .await
    }

    /// Store a payload from a trusted feed without an owner check
    pub async fn receive_trusted(
        &self,
        id: &str,
        payload: &[u8],
    ) -> ServiceResult<(ReceiveOutcome, Sample)> {
        self.receive_from_feed(id, None, payload).await
    }

    /// Set the category of a sample from its channel identifier
    pub async fn classify(&self, id: &str, channel: i64) -> ServiceResult<Sample> {
        let category = classify_channel(channel)?;
        let (_, sample) = self
            .modify(id, |sample| {
                if sample.category == category {
                    return Ok(Step::Keep(()));
                }
                sample.category = category;
                Ok(Step::Write(()))
            })
            .await?;
        debug!(sample_id = %id, category = %category, "sample classified");
        Ok(sample)
    }

    /// Device-side creation of a record with no owner yet
    pub async fn create_unbound(&self, id: &str) -> ServiceResult<Sample> {
        let sample = self.store.create(new_record(id)?).await?;
        info!(sample_id = %id, device = %sample.device_ref, "unbound sample created");
        Ok(sample)
    }

    async fn modify<T, F>(&self, id: &str, mut apply: F) -> ServiceResult<(T, Sample)>
    where
        F: FnMut(&mut Sample) -> ServiceResult<Step<T>>,
    {
        for attempt in 1..=self.max_update_attempts {
            let mut sample = self.store.get(id).await?;
            let expected_version = sample.version;

            let value = match apply(&mut sample)? {
                Step::Keep(value) => return Ok((value, sample)),
                Step::Write(value) => value,
            };

            match self.store.update(sample, expected_version).await {
                Ok(saved) => return Ok((value, saved)),
                Err(StoreError::VersionConflict { expected, actual }) => {
                    debug!(
                        sample_id = %id,
                        attempt,
                        expected,
                        actual,
                        "concurrent sample update; retrying"
                    );
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(self.exhausted(id))
    }

    fn exhausted(&self, id: &str) -> ServiceError {
        warn!(
            sample_id = %id,
            attempts = self.max_update_attempts,
            "giving up on contended sample update"
        );
        ServiceError::Storage(format!(
            "sample '{}' update conflicted {} times",
            id, self.max_update_attempts
        ))
    }
}

fn bind_existing(sample: &mut Sample, owner: &OwnerRef) -> ServiceResult<Step<BindOutcome>> {
    match &sample.owner {
        Some(bound) if bound == owner => Ok(Step::Keep(BindOutcome::AlreadyBound)),
        Some(_) => Err(ServiceError::Conflict(format!(
            "sample '{}' is bound to another owner",
            sample.id
        ))),
        None => {
            sample.owner = Some(owner.clone());
            if sample.lifecycle_state == LifecycleState::Unbound {
                sample.lifecycle_state = LifecycleState::Bound;
            }
            info!(sample_id = %sample.id, owner = %owner, "sample bound");
            Ok(Step::Write(BindOutcome::Bound))
        }
    }
}

fn check_owner(sample: &Sample, owner: &OwnerRef) -> ServiceResult<()> {
    match &sample.owner {
        Some(bound) if bound != owner => Err(ServiceError::Forbidden(format!(
            "sample '{}' is not owned by '{}'",
            sample.id, owner
        ))),
        _ => Ok(()),
    }
}

fn apply_payload(
    sample: &mut Sample,
    payload: &[u8],
    suppress_duplicates: bool,
) -> Step<ReceiveOutcome> {
    let digest = payload_digest(payload);
    if suppress_duplicates
        && sample.lifecycle_state == LifecycleState::DataReceived
        && sample.payload_digest == Some(digest)
    {
        debug!(sample_id = %sample.id, "duplicate payload ignored");
        return Step::Keep(ReceiveOutcome::Duplicate);
    }

    sample.payload = payload.to_vec();
    sample.payload_digest = Some(digest);
    sample.timestamp = Utc::now();
    sample.lifecycle_state = LifecycleState::DataReceived;
    Step::Write(ReceiveOutcome::Stored)
}

fn ensure_payload(payload: &[u8]) -> ServiceResult<()> {
    if payload.is_empty() {
        return Err(ServiceError::InvalidInput("payload cannot be empty".to_string()));
    }
    Ok(())
}

/// Fresh unbound record; device and time come from the id when it parses
fn new_record(id: &str) -> ServiceResult<Sample> {
    if !sample_id::is_valid(id) {
        return Err(ServiceError::InvalidInput("sample id cannot be empty".to_string()));
    }

    match sample_id::parse(id) {
        Ok(parsed) => {
            let timestamp = parsed.timestamp_utc();
            Ok(Sample::new(id, parsed.device_ref, timestamp))
        }
        Err(_) => Ok(Sample::new(id, sample_id::device_ref(id)?, Utc::now())),
    }
}
