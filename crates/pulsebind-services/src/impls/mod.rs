// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Service implementations backed by the rendezvous registry and a record store.
*/

pub mod binding_service_impl;

// Re-export for convenience
pub use binding_service_impl::BindingServiceImpl;
