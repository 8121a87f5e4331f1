// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Transport-agnostic types for the service layer.
*/

pub mod errors;
pub mod sample;

// Re-export for convenience
pub use errors::{ServiceError, ServiceResult};
pub use sample::{payload_digest, LifecycleState, Sample};
