// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # pulsebind Configuration System
//!
//! Type-safe configuration loader for pulsebind with support for:
//! - TOML file parsing
//! - Environment variable overrides
//! - CLI argument overrides
//!
//! ## Usage
//!
//! ```rust,no_run
//! use pulsebind_config::{load_config, validate_config};
//!
//! let config = load_config(None, None).expect("Failed to load config");
//! validate_config(&config).expect("Invalid config");
//!
//! println!("Rendezvous TTL: {}s", config.registry.rendezvous_ttl_secs);
//! println!("Feed topic: {}", config.feed.topic);
//! ```

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod loader;
pub mod types;
pub mod validation;

pub use loader::{apply_cli_overrides, apply_environment_overrides, find_config_file, load_config};
pub use types::*;
pub use validation::{validate_config, ConfigValidationError};

/// Name of the configuration file searched for during discovery
pub const CONFIG_FILE_NAME: &str = "pulsebind.toml";

/// Environment variable naming an explicit configuration file
pub const CONFIG_PATH_ENV: &str = "PULSEBIND_CONFIG_PATH";

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config file not found. Searched: {0}")]
    FileNotFound(String),

    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid TOML syntax: {0}")]
    ParseError(String),

    #[error("Validation failed: {0}")]
    ValidationError(String),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_round_trips_through_toml() {
        let config = PulsebindConfig::default();
        let text = toml::to_string(&config).unwrap();
        let parsed: PulsebindConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed.registry.rendezvous_ttl_secs, config.registry.rendezvous_ttl_secs);
        assert_eq!(parsed.feed.topic, config.feed.topic);
    }
}
