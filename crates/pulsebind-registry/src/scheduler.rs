// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Expiry scheduler
//!
//! One task per registry keeps a min-heap of deadlines and removes entries as
//! they come due. Every scheduled removal is tagged with the entry generation,
//! so a removal that fires after the key was claimed and registered again
//! leaves the newer entry alone.

use parking_lot::Mutex;
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::sync::Weak;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, trace};

use crate::registry::RegistryState;
use crate::{RegistryError, Result};

enum Command {
    Schedule {
        id: String,
        generation: u64,
        deadline: Instant,
    },
    Cancel {
        generation: u64,
    },
}

pub(crate) struct ExpiryScheduler {
    commands: UnboundedSender<Command>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl ExpiryScheduler {
    /// Spawn the scheduler task on the current tokio runtime
    pub(crate) fn spawn(state: Weak<RegistryState>) -> Result<Self> {
        let handle = tokio::runtime::Handle::try_current()
            .map_err(|_| RegistryError::RuntimeUnavailable)?;
        let (commands, receiver) = mpsc::unbounded_channel();
        let task = handle.spawn(run(state, receiver));

        Ok(Self {
            commands,
            task: Mutex::new(Some(task)),
        })
    }

    pub(crate) fn schedule(&self, id: &str, generation: u64, deadline: Instant) {
        let command = Command::Schedule {
            id: id.to_string(),
            generation,
            deadline,
        };
        if self.commands.send(command).is_err() {
            trace!("expiry scheduler stopped; '{}' will expire lazily", id);
        }
    }

    pub(crate) fn cancel(&self, generation: u64) {
        let _ = self.commands.send(Command::Cancel { generation });
    }

    pub(crate) fn is_running(&self) -> bool {
        self.task
            .lock()
            .as_ref()
            .map(|task| !task.is_finished())
            .unwrap_or(false)
    }

    pub(crate) fn stop(&self) {
        if let Some(task) = self.task.lock().take() {
            task.abort();
        }
    }
}

impl Drop for ExpiryScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn run(state: Weak<RegistryState>, mut commands: UnboundedReceiver<Command>) {
    let mut deadlines: BinaryHeap<Reverse<(Instant, u64)>> = BinaryHeap::new();
    let mut pending: HashMap<u64, String> = HashMap::new();

    debug!("rendezvous expiry scheduler started");

    loop {
        let next_deadline = deadlines.peek().map(|Reverse((deadline, _))| *deadline);

        tokio::select! {
            command = commands.recv() => match command {
                Some(Command::Schedule { id, generation, deadline }) => {
                    pending.insert(generation, id);
                    deadlines.push(Reverse((deadline, generation)));
                }
                Some(Command::Cancel { generation }) => {
                    pending.remove(&generation);
                }
                None => break,
            },
            _ = sleep_until(next_deadline.unwrap_or_else(Instant::now)), if next_deadline.is_some() => {
                let now = Instant::now();
                while let Some(Reverse((deadline, generation))) = deadlines.peek().copied() {
                    if deadline > now {
                        break;
                    }
                    deadlines.pop();

                    let Some(id) = pending.remove(&generation) else {
                        continue;
                    };
                    let Some(registry) = state.upgrade() else {
                        debug!("registry dropped; expiry scheduler exiting");
                        return;
                    };
                    if registry.expire(&id, generation) {
                        debug!(sample_id = %id, "rendezvous expired unclaimed");
                    }
                }
            }
        }
    }

    debug!("rendezvous expiry scheduler stopped");
}
