// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Service trait definitions.

These traits define the stable application boundary between transport
adapters (HTTP handlers, the feed consumer) and the binding core.
*/

pub mod binding_service;

// Re-export for convenience
pub use binding_service::{BindingService, ClaimedSample};
