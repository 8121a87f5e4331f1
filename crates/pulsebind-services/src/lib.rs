// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
# Pulsebind Service Layer

The application boundary of the binding core. Transport adapters (the excluded
HTTP layer, the feed consumer in `pulsebind-io`) depend on the
[`BindingService`] trait; the implementation coordinates the rendezvous
registry, the sample state machine and the record store.

## Architecture

```text
┌─────────────────────────────────────────────────────────────┐
│             ADAPTERS  (HTTP handlers, feed consumer)        │
└──────────────────────────────┬──────────────────────────────┘
                               ↓
┌─────────────────────────────────────────────────────────────┐
│  BindingService  → register / claim / bind / receive data   │
└───────────────┬───────────────────────────────┬─────────────┘
                ↓                               ↓
┌──────────────────────────────┐ ┌────────────────────────────┐
│ RendezvousRegistry (TTL map) │ │ SampleStateMachine         │
└──────────────────────────────┘ │   └─ RecordStore (trait)   │
                                 └────────────────────────────┘
```

Errors are translated into the transport-agnostic [`ServiceError`].
*/

pub mod category;
pub mod impls;
pub mod sample_id;
pub mod state_machine;
pub mod store;
pub mod traits;
pub mod types;

// Re-export for convenience
pub use category::{classify_channel, Category, CategoryError};
pub use impls::BindingServiceImpl;
pub use sample_id::{ParsedSampleId, SampleIdError};
pub use state_machine::{BindOutcome, ReceiveOutcome, SampleStateMachine};
pub use store::{InMemoryRecordStore, RecordStore, StoreError, StoreResult};
pub use traits::{BindingService, ClaimedSample};
pub use types::*;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
