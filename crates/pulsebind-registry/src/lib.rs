// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Rendezvous registry for pulsebind
//!
//! A user claims a collection session before the collecting device has
//! produced any data by registering the session id here. The entry lives for a
//! bounded time; whoever claims it first (or the expiry, if nobody does)
//! consumes it.
//!
//! The registry spreads keys over a fixed set of lock shards so that operations
//! on the same id are serialized while unrelated ids proceed in parallel. A
//! single scheduler task per registry removes entries whose time-to-live has
//! elapsed.

pub mod registry;
mod scheduler;
pub mod types;

pub use registry::RendezvousRegistry;
pub use types::{OwnerRef, RendezvousEntry};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("Rendezvous already pending for id: {0}")]
    Conflict(String),

    #[error("No pending rendezvous for id: {0}")]
    NotFound(String),

    #[error("Invalid rendezvous id: {0}")]
    InvalidId(String),

    #[error("Rendezvous time-to-live must be positive and representable")]
    InvalidTtl,

    #[error("Registry requires a running tokio runtime")]
    RuntimeUnavailable,
}

pub type Result<T> = std::result::Result<T, RegistryError>;
