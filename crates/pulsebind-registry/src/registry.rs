// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Rendezvous registry implementation

use ahash::RandomState;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use pulsebind_config::RegistryConfig;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::scheduler::ExpiryScheduler;
use crate::{OwnerRef, RegistryError, RendezvousEntry, Result};

struct Slot {
    entry: RendezvousEntry,
    deadline: Instant,
    generation: u64,
}

impl Slot {
    fn is_live(&self, now: Instant) -> bool {
        self.deadline > now
    }
}

type Shard = Mutex<HashMap<String, Slot>>;

/// Sharded storage shared between the registry handle and its scheduler
pub(crate) struct RegistryState {
    shards: Box<[Shard]>,
    hasher: RandomState,
    next_generation: AtomicU64,
}

impl RegistryState {
    fn new(shard_count: usize) -> Self {
        let shards = (0..shard_count.max(1))
            .map(|_| Mutex::new(HashMap::new()))
            .collect::<Vec<_>>()
            .into_boxed_slice();

        Self {
            shards,
            hasher: RandomState::new(),
            next_generation: AtomicU64::new(1),
        }
    }

    fn shard(&self, id: &str) -> &Shard {
        let index = (self.hasher.hash_one(id) % self.shards.len() as u64) as usize;
        &self.shards[index]
    }

    /// Remove `id` if it still holds the entry registered as `generation`
    pub(crate) fn expire(&self, id: &str, generation: u64) -> bool {
        let mut shard = self.shard(id).lock();
        match shard.get(id) {
            Some(slot) if slot.generation == generation => {
                shard.remove(id);
                true
            }
            _ => false,
        }
    }
}

/// Time-bounded mapping from session id to owner
///
/// `register` and `claim` on the same id are linearizable: both run under the
/// lock of the shard the id hashes to. Entries are removed by the first of a
/// successful `claim` or their deadline; both paths also compare the deadline
/// with the current time, so a late scheduler never makes an expired entry
/// claimable.
///
/// Must be created inside a tokio runtime (the expiry scheduler is spawned on
/// it). The scheduler stops when the registry is dropped or shut down.
pub struct RendezvousRegistry {
    state: Arc<RegistryState>,
    scheduler: ExpiryScheduler,
    default_ttl: Duration,
}

impl RendezvousRegistry {
    /// Create a registry
    ///
    /// # Arguments
    /// * `shard_count` - Number of lock shards (at least 1)
    /// * `default_ttl` - Lifetime used by [`register_default`](Self::register_default)
    pub fn new(shard_count: usize, default_ttl: Duration) -> Result<Self> {
        let state = Arc::new(RegistryState::new(shard_count));
        let scheduler = ExpiryScheduler::spawn(Arc::downgrade(&state))?;

        info!(
            "Initializing rendezvous registry (shards={}, default_ttl={:?})",
            state.shards.len(),
            default_ttl
        );

        Ok(Self {
            state,
            scheduler,
            default_ttl,
        })
    }

    pub fn from_config(config: &RegistryConfig) -> Result<Self> {
        Self::new(config.shards, config.rendezvous_ttl())
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Register a pending rendezvous
    ///
    /// Fails with `Conflict` if a live entry for `id` already exists. An entry
    /// that is still stored but past its deadline is replaced.
    pub fn register(&self, id: &str, owner: OwnerRef, ttl: Duration) -> Result<RendezvousEntry> {
        let id = validate_id(id)?;
        if ttl.is_zero() {
            return Err(RegistryError::InvalidTtl);
        }

        let now = Instant::now();
        let deadline = now.checked_add(ttl).ok_or(RegistryError::InvalidTtl)?;
        let created_at = Utc::now();
        let expires_at = chrono::Duration::from_std(ttl)
            .ok()
            .and_then(|ttl| created_at.checked_add_signed(ttl))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        let (entry, generation) = {
            let mut shard = self.state.shard(id).lock();

            if let Some(existing) = shard.get(id) {
                if existing.is_live(now) {
                    debug!(sample_id = %id, "rendezvous already pending");
                    return Err(RegistryError::Conflict(id.to_string()));
                }
                debug!(sample_id = %id, "replacing expired rendezvous entry");
            }

            let generation = self.state.next_generation.fetch_add(1, Ordering::Relaxed);
            let entry = RendezvousEntry {
                id: id.to_string(),
                owner,
                created_at,
                expires_at,
            };
            shard.insert(
                id.to_string(),
                Slot {
                    entry: entry.clone(),
                    deadline,
                    generation,
                },
            );
            (entry, generation)
        };

        self.scheduler.schedule(id, generation, deadline);
        info!(sample_id = %id, owner = %entry.owner, ttl = ?ttl, "rendezvous registered");

        Ok(entry)
    }

    /// Register with the configured default time-to-live
    pub fn register_default(&self, id: &str, owner: OwnerRef) -> Result<RendezvousEntry> {
        self.register(id, owner, self.default_ttl)
    }

    /// Atomically consume a pending rendezvous
    ///
    /// Returns the owner that registered it. Fails with `NotFound` if there is
    /// no entry or it has expired; the pending expiry of a claimed entry is
    /// cancelled.
    pub fn claim(&self, id: &str) -> Result<OwnerRef> {
        let id = id.trim();
        let now = Instant::now();

        let slot = self.state.shard(id).lock().remove(id);

        match slot {
            Some(slot) => {
                self.scheduler.cancel(slot.generation);
                if slot.is_live(now) {
                    info!(sample_id = %id, owner = %slot.entry.owner, "rendezvous claimed");
                    Ok(slot.entry.owner)
                } else {
                    debug!(sample_id = %id, "claim raced expiry; entry already expired");
                    Err(RegistryError::NotFound(id.to_string()))
                }
            }
            None => Err(RegistryError::NotFound(id.to_string())),
        }
    }

    /// Look at a live entry without consuming it
    pub fn peek(&self, id: &str) -> Option<RendezvousEntry> {
        let id = id.trim();
        let now = Instant::now();
        self.state
            .shard(id)
            .lock()
            .get(id)
            .filter(|slot| slot.is_live(now))
            .map(|slot| slot.entry.clone())
    }

    /// Number of live (unexpired, unclaimed) entries
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.state
            .shards
            .iter()
            .map(|shard| shard.lock().values().filter(|slot| slot.is_live(now)).count())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether the expiry scheduler task is still running
    pub fn is_scheduler_running(&self) -> bool {
        self.scheduler.is_running()
    }

    /// Stop the expiry scheduler
    ///
    /// The registry keeps working afterwards; expired entries are then only
    /// dropped lazily by `register`/`claim`.
    pub fn shutdown(&self) {
        if self.scheduler.is_running() {
            warn!("rendezvous registry scheduler shutting down");
        }
        self.scheduler.stop();
    }

    #[cfg(test)]
    fn stored_slots(&self) -> usize {
        self.state.shards.iter().map(|shard| shard.lock().len()).sum()
    }
}

fn validate_id(id: &str) -> Result<&str> {
    let id = id.trim();
    if id.is_empty() {
        return Err(RegistryError::InvalidId("id cannot be empty".to_string()));
    }
    Ok(id)
}
