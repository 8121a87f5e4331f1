// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration validation
//!
//! Ensures configuration values are within valid ranges and consistent with
//! each other before any component is started.

use crate::{ConfigError, ConfigResult, FeedTransport, PulsebindConfig};

/// Validation errors that can occur during config validation
#[derive(Debug, Clone)]
pub enum ConfigValidationError {
    MissingRequired { field: String },
    InvalidValue { field: String, reason: String },
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingRequired { field } => {
                write!(f, "Missing required configuration: {}", field)
            }
            Self::InvalidValue { field, reason } => {
                write!(f, "Invalid configuration value for {}: {}", field, reason)
            }
        }
    }
}

/// Validate the complete configuration
///
/// # Errors
///
/// Returns `ConfigError::ValidationError` listing every violation found
pub fn validate_config(config: &PulsebindConfig) -> ConfigResult<()> {
    let mut errors = Vec::new();

    validate_required_fields(config, &mut errors);
    validate_value_ranges(config, &mut errors);

    if !errors.is_empty() {
        let error_messages = errors
            .iter()
            .map(|e| format!("  - {}", e))
            .collect::<Vec<_>>()
            .join("\n");

        return Err(ConfigError::ValidationError(format!(
            "Configuration validation failed:\n{}",
            error_messages
        )));
    }

    Ok(())
}

fn validate_required_fields(config: &PulsebindConfig, errors: &mut Vec<ConfigValidationError>) {
    if config.feed.topic.trim().is_empty() {
        errors.push(ConfigValidationError::MissingRequired {
            field: "feed.topic".to_string(),
        });
    }

    if config.feed.transport == FeedTransport::Zmq && config.feed.endpoint.trim().is_empty() {
        errors.push(ConfigValidationError::MissingRequired {
            field: "feed.endpoint".to_string(),
        });
    }

    if config.feed.transport == FeedTransport::Mqtt {
        if config.feed.broker.trim().is_empty() {
            errors.push(ConfigValidationError::MissingRequired {
                field: "feed.broker".to_string(),
            });
        }
        if config.feed.client_id.trim().is_empty() {
            errors.push(ConfigValidationError::MissingRequired {
                field: "feed.client_id".to_string(),
            });
        }
    }
}

fn validate_value_ranges(config: &PulsebindConfig, errors: &mut Vec<ConfigValidationError>) {
    let must_be_positive = [
        ("registry.rendezvous_ttl_secs", config.registry.rendezvous_ttl_secs),
        ("registry.shards", config.registry.shards as u64),
        ("samples.max_update_attempts", u64::from(config.samples.max_update_attempts)),
        ("feed.channel_capacity", config.feed.channel_capacity as u64),
        ("ingestion.handler_timeout_ms", config.ingestion.handler_timeout_ms),
    ];

    for (field, value) in must_be_positive {
        if value == 0 {
            errors.push(ConfigValidationError::InvalidValue {
                field: field.to_string(),
                reason: "must be positive".to_string(),
            });
        }
    }

    let level = config.logging.level.to_lowercase();
    if !matches!(level.as_str(), "trace" | "debug" | "info" | "warn" | "error") {
        errors.push(ConfigValidationError::InvalidValue {
            field: "logging.level".to_string(),
            reason: "must be one of trace, debug, info, warn, error".to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = PulsebindConfig::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_zero_ttl_rejected() {
        let mut config = PulsebindConfig::default();
        config.registry.rendezvous_ttl_secs = 0;

        let result = validate_config(&config);
        if let Err(ConfigError::ValidationError(msg)) = result {
            assert!(msg.contains("registry.rendezvous_ttl_secs"));
        } else {
            panic!("expected validation error");
        }
    }

    #[test]
    fn test_zmq_requires_endpoint() {
        let mut config = PulsebindConfig::default();
        config.feed.transport = FeedTransport::Zmq;

        let result = validate_config(&config);
        if let Err(ConfigError::ValidationError(msg)) = result {
            assert!(msg.contains("feed.endpoint"));
        } else {
            panic!("expected validation error");
        }

        config.feed.endpoint = "tcp://127.0.0.1:5570".to_string();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_mqtt_requires_broker() {
        let mut config = PulsebindConfig::default();
        config.feed.transport = FeedTransport::Mqtt;
        config.feed.client_id = String::new();

        let result = validate_config(&config);
        if let Err(ConfigError::ValidationError(msg)) = result {
            assert!(msg.contains("feed.broker"));
            assert!(msg.contains("feed.client_id"));
        } else {
            panic!("expected validation error");
        }

        config.feed.broker = "tcp://127.0.0.1:1883".to_string();
        config.feed.client_id = "collector".to_string();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_all_violations_reported() {
        let mut config = PulsebindConfig::default();
        config.feed.topic = "  ".to_string();
        config.registry.shards = 0;
        config.logging.level = "verbose".to_string();

        let Err(ConfigError::ValidationError(msg)) = validate_config(&config) else {
            panic!("expected validation error");
        };
        assert!(msg.contains("feed.topic"));
        assert!(msg.contains("registry.shards"));
        assert!(msg.contains("logging.level"));
    }
}
