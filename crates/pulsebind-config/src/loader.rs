// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration file loading with override support
//!
//! Values are resolved in three tiers:
//! 1. TOML file (base defaults)
//! 2. Environment variables (runtime overrides)
//! 3. CLI arguments (explicit user overrides)

use crate::{ConfigError, ConfigResult, PulsebindConfig, CONFIG_FILE_NAME, CONFIG_PATH_ENV};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Find the pulsebind configuration file
///
/// Search order:
/// 1. `PULSEBIND_CONFIG_PATH` environment variable
/// 2. Current working directory: `./pulsebind.toml`
/// 3. Up to five parent directories
///
/// # Errors
///
/// Returns `ConfigError::FileNotFound` if no config file is found in any location
pub fn find_config_file() -> ConfigResult<PathBuf> {
    if let Ok(env_path) = env::var(CONFIG_PATH_ENV) {
        let path = PathBuf::from(env_path);
        if path.exists() {
            return Ok(path);
        }
        return Err(ConfigError::FileNotFound(format!(
            "Config file specified by {} not found: {}",
            CONFIG_PATH_ENV,
            path.display()
        )));
    }

    let mut search_paths = Vec::new();
    if let Ok(cwd) = env::current_dir() {
        search_paths.push(cwd.join(CONFIG_FILE_NAME));

        let mut current = cwd.clone();
        for _ in 0..5 {
            if let Some(parent) = current.parent() {
                search_paths.push(parent.join(CONFIG_FILE_NAME));
                current = parent.to_path_buf();
            }
        }
    }

    for path in &search_paths {
        if path.exists() {
            return Ok(path.clone());
        }
    }

    let search_list = search_paths
        .iter()
        .map(|p| format!("  - {}", p.display()))
        .collect::<Vec<_>>()
        .join("\n");

    Err(ConfigError::FileNotFound(format!(
        "'{}' not found in any of these locations:\n{}\n\nSet {} to specify a custom location.",
        CONFIG_FILE_NAME, search_list, CONFIG_PATH_ENV
    )))
}

/// Load configuration from TOML file
///
/// # Arguments
///
/// * `config_path` - Optional path to config file. If `None`, will search for config file.
/// * `cli_args` - Optional CLI argument overrides (`dotted.key -> value`)
///
/// # Errors
///
/// Returns error if the file is not found, contains invalid TOML, or an override
/// value cannot be parsed
pub fn load_config(
    config_path: Option<&Path>,
    cli_args: Option<&HashMap<String, String>>,
) -> ConfigResult<PulsebindConfig> {
    let config_file = match config_path {
        Some(path) => path.to_path_buf(),
        None => find_config_file()?,
    };

    let content = fs::read_to_string(&config_file)?;
    let mut config: PulsebindConfig = toml::from_str(&content)?;

    apply_environment_overrides(&mut config)?;
    if let Some(cli) = cli_args {
        apply_cli_overrides(&mut config, cli)?;
    }

    Ok(config)
}

/// Apply environment variable overrides to configuration
///
/// Supported environment variables:
/// - `PULSEBIND_RENDEZVOUS_TTL_SECS` -> `registry.rendezvous_ttl_secs`
/// - `PULSEBIND_FEED_TRANSPORT` -> `feed.transport`
/// - `PULSEBIND_FEED_ENDPOINT` -> `feed.endpoint`
/// - `PULSEBIND_FEED_TOPIC` -> `feed.topic`
/// - `PULSEBIND_MQTT_BROKER` -> `feed.broker`
/// - `PULSEBIND_MQTT_CLIENT_ID` -> `feed.client_id`
/// - `PULSEBIND_MQTT_USERNAME` -> `feed.username`
/// - `PULSEBIND_MQTT_PASSWORD` -> `feed.password`
/// - `PULSEBIND_REQUIRE_OWNER` -> `ingestion.require_owner`
/// - `PULSEBIND_LOG_LEVEL` -> `logging.level`
pub fn apply_environment_overrides(config: &mut PulsebindConfig) -> ConfigResult<()> {
    const MAPPING: &[(&str, &str)] = &[
        ("PULSEBIND_RENDEZVOUS_TTL_SECS", "registry.rendezvous_ttl_secs"),
        ("PULSEBIND_FEED_TRANSPORT", "feed.transport"),
        ("PULSEBIND_FEED_ENDPOINT", "feed.endpoint"),
        ("PULSEBIND_FEED_TOPIC", "feed.topic"),
        ("PULSEBIND_MQTT_BROKER", "feed.broker"),
        ("PULSEBIND_MQTT_CLIENT_ID", "feed.client_id"),
        ("PULSEBIND_MQTT_USERNAME", "feed.username"),
        ("PULSEBIND_MQTT_PASSWORD", "feed.password"),
        ("PULSEBIND_REQUIRE_OWNER", "ingestion.require_owner"),
        ("PULSEBIND_LOG_LEVEL", "logging.level"),
    ];

    for (var, key) in MAPPING {
        if let Ok(value) = env::var(var) {
            set_value(config, key, &value)?;
        }
    }
    Ok(())
}

/// Apply CLI argument overrides to configuration
///
/// Keys use the dotted TOML path, e.g. `{"feed.topic": "lab/raw"}`.
pub fn apply_cli_overrides(
    config: &mut PulsebindConfig,
    cli_args: &HashMap<String, String>,
) -> ConfigResult<()> {
    for (key, value) in cli_args {
        set_value(config, key, value)?;
    }
    Ok(())
}

fn set_value(config: &mut PulsebindConfig, key: &str, value: &str) -> ConfigResult<()> {
    match key {
        "registry.rendezvous_ttl_secs" => config.registry.rendezvous_ttl_secs = parse(key, value)?,
        "registry.shards" => config.registry.shards = parse(key, value)?,
        "samples.max_update_attempts" => config.samples.max_update_attempts = parse(key, value)?,
        "feed.transport" => {
            config.feed.transport = value.parse().map_err(ConfigError::InvalidValue)?;
        }
        "feed.endpoint" => config.feed.endpoint = value.to_string(),
        "feed.topic" => config.feed.topic = value.to_string(),
        "feed.channel_capacity" => config.feed.channel_capacity = parse(key, value)?,
        "feed.broker" => config.feed.broker = value.to_string(),
        "feed.client_id" => config.feed.client_id = value.to_string(),
        "feed.username" => config.feed.username = Some(value.to_string()),
        "feed.password" => config.feed.password = Some(value.to_string()),
        "ingestion.require_owner" => config.ingestion.require_owner = parse_bool(value),
        "ingestion.handler_timeout_ms" => config.ingestion.handler_timeout_ms = parse(key, value)?,
        "logging.level" => config.logging.level = value.to_string(),
        "logging.directory" => config.logging.directory = value.to_string(),
        _ => {
            return Err(ConfigError::InvalidValue(format!(
                "unknown configuration key '{}'",
                key
            )))
        }
    }
    Ok(())
}

fn parse<T: std::str::FromStr>(key: &str, value: &str) -> ConfigResult<T> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidValue(format!("{} = '{}'", key, value)))
}

fn parse_bool(value: &str) -> bool {
    let value = value.trim().to_lowercase();
    value == "true" || value == "1" || value == "yes"
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use std::sync::Mutex;
    use tempfile::tempdir;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn test_find_config_file_env_var() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("custom_config.toml");
        File::create(&config_path).unwrap();

        env::set_var(CONFIG_PATH_ENV, config_path.to_str().unwrap());
        let result = find_config_file();
        env::remove_var(CONFIG_PATH_ENV);

        assert_eq!(result.unwrap(), config_path);
    }

    #[test]
    fn test_find_config_file_env_var_missing_file() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        env::set_var(CONFIG_PATH_ENV, "/nonexistent/pulsebind.toml");
        let result = find_config_file();
        env::remove_var(CONFIG_PATH_ENV);

        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_load_minimal_config() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        env::remove_var("PULSEBIND_FEED_TOPIC");
        env::remove_var("PULSEBIND_RENDEZVOUS_TTL_SECS");
        let dir = tempdir().unwrap();
        let config_path = dir.path().join(CONFIG_FILE_NAME);

        let mut file = File::create(&config_path).unwrap();
        writeln!(file, "[registry]").unwrap();
        writeln!(file, "rendezvous_ttl_secs = 60").unwrap();
        writeln!(file, "[feed]").unwrap();
        writeln!(file, "transport = \"zmq\"").unwrap();
        writeln!(file, "endpoint = \"tcp://127.0.0.1:5570\"").unwrap();

        let config = load_config(Some(&config_path), None).unwrap();

        assert_eq!(config.registry.rendezvous_ttl_secs, 60);
        assert_eq!(config.feed.transport, crate::FeedTransport::Zmq);
        assert_eq!(config.feed.endpoint, "tcp://127.0.0.1:5570");
        assert_eq!(config.feed.topic, "samples/data");
    }

    #[test]
    fn test_invalid_toml() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&config_path, "[registry\nrendezvous_ttl_secs = ").unwrap();

        let result = load_config(Some(&config_path), None);
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_environment_overrides() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        let mut config = PulsebindConfig::default();

        env::set_var("PULSEBIND_FEED_TOPIC", "lab/raw");
        env::set_var("PULSEBIND_REQUIRE_OWNER", "yes");

        let result = apply_environment_overrides(&mut config);

        env::remove_var("PULSEBIND_FEED_TOPIC");
        env::remove_var("PULSEBIND_REQUIRE_OWNER");

        result.unwrap();
        assert_eq!(config.feed.topic, "lab/raw");
        assert!(config.ingestion.require_owner);
    }

    #[test]
    fn test_cli_overrides() {
        let mut config = PulsebindConfig::default();
        let mut cli_args = HashMap::new();
        cli_args.insert("registry.rendezvous_ttl_secs".to_string(), "45".to_string());
        cli_args.insert("feed.transport".to_string(), "zmq".to_string());

        apply_cli_overrides(&mut config, &cli_args).unwrap();

        assert_eq!(config.registry.rendezvous_ttl_secs, 45);
        assert_eq!(config.feed.transport, crate::FeedTransport::Zmq);
    }

    #[test]
    fn test_mqtt_feed_section() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        let dir = tempdir().unwrap();
        let config_path = dir.path().join(CONFIG_FILE_NAME);

        let mut file = File::create(&config_path).unwrap();
        writeln!(file, "[feed]").unwrap();
        writeln!(file, "transport = \"mqtt\"").unwrap();
        writeln!(file, "broker = \"tcp://broker.local:1883\"").unwrap();
        writeln!(file, "client_id = \"collector-1\"").unwrap();
        writeln!(file, "username = \"device\"").unwrap();

        let mut cli_args = HashMap::new();
        cli_args.insert("feed.password".to_string(), "secret".to_string());
        let config = load_config(Some(&config_path), Some(&cli_args)).unwrap();

        assert_eq!(config.feed.transport, crate::FeedTransport::Mqtt);
        assert_eq!(config.feed.broker, "tcp://broker.local:1883");
        assert_eq!(config.feed.client_id, "collector-1");
        assert_eq!(config.feed.username.as_deref(), Some("device"));
        assert_eq!(config.feed.password.as_deref(), Some("secret"));
    }

    #[test]
    fn test_cli_override_rejects_bad_values() {
        let mut config = PulsebindConfig::default();
        let mut cli_args = HashMap::new();
        cli_args.insert("registry.shards".to_string(), "many".to_string());
        assert!(matches!(
            apply_cli_overrides(&mut config, &cli_args),
            Err(ConfigError::InvalidValue(_))
        ));

        let mut cli_args = HashMap::new();
        cli_args.insert("registry.colour".to_string(), "blue".to_string());
        assert!(apply_cli_overrides(&mut config, &cli_args).is_err());
    }

    #[test]
    fn test_override_precedence() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        let dir = tempdir().unwrap();
        let config_path = dir.path().join(CONFIG_FILE_NAME);

        let mut file = File::create(&config_path).unwrap();
        writeln!(file, "[feed]").unwrap();
        writeln!(file, "topic = \"file-topic\"").unwrap();
        writeln!(file, "[registry]").unwrap();
        writeln!(file, "rendezvous_ttl_secs = 10").unwrap();

        env::set_var("PULSEBIND_FEED_TOPIC", "env-topic");
        env::set_var("PULSEBIND_RENDEZVOUS_TTL_SECS", "20");

        let mut cli_args = HashMap::new();
        cli_args.insert("feed.topic".to_string(), "cli-topic".to_string());

        let config = load_config(Some(&config_path), Some(&cli_args));

        env::remove_var("PULSEBIND_FEED_TOPIC");
        env::remove_var("PULSEBIND_RENDEZVOUS_TTL_SECS");

        // CLI wins for topic, env wins for TTL (no CLI override)
        let config = config.unwrap();
        assert_eq!(config.feed.topic, "cli-topic");
        assert_eq!(config.registry.rendezvous_ttl_secs, 20);
    }
}
