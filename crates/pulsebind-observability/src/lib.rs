// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # pulsebind-observability
//!
//! Logging setup shared by every pulsebind crate, with per-crate debug flag
//! support.
//!
//! ## Features
//! - `file-logging`: daily-rotated JSON log files next to console output

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod cli;
pub mod init;

pub use cli::*;
pub use init::*;

/// Known pulsebind crate names for debug flags
pub const KNOWN_CRATES: &[&str] = &[
    "pulsebind",
    "pulsebind-config",
    "pulsebind-registry",
    "pulsebind-services",
    "pulsebind-io",
];
