// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Logging initialization
//!
//! Console output is always installed; with the `file-logging` feature and a
//! non-empty `logging.directory`, a daily-rotated JSON file is written as well.

use anyhow::{anyhow, Result};
use pulsebind_config::{LogFormat, LoggingConfig};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

use crate::cli::CrateDebugFlags;

/// Keeps background log writers alive; flushes on drop
pub struct LoggingGuard {
    #[cfg(feature = "file-logging")]
    _file_guard: Option<tracing_appender::non_blocking::WorkerGuard>,
    filter: String,
}

impl LoggingGuard {
    /// The filter directive the subscriber was installed with
    pub fn filter(&self) -> &str {
        &self.filter
    }
}

/// Build the `EnvFilter` directive from config and debug flags
///
/// `RUST_LOG`, when set, takes precedence over both.
pub fn filter_directive(debug_flags: &CrateDebugFlags, config: &LoggingConfig) -> String {
    std::env::var("RUST_LOG").unwrap_or_else(|_| debug_flags.to_filter_string(&config.level))
}

/// Initialize the global tracing subscriber
///
/// # Errors
///
/// Fails if the filter directive is invalid or a global subscriber is already set.
pub fn init_logging(debug_flags: &CrateDebugFlags, config: &LoggingConfig) -> Result<LoggingGuard> {
    let filter = filter_directive(debug_flags, config);
    let env_filter =
        EnvFilter::try_new(&filter).map_err(|e| anyhow!("invalid log filter '{}': {}", filter, e))?;

    let mut layers = Vec::new();

    let console_layer = match config.format {
        LogFormat::Text => tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_filter(env_filter)
            .boxed(),
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_filter(env_filter)
            .boxed(),
    };
    layers.push(console_layer);

    #[cfg(feature = "file-logging")]
    let file_guard = if config.directory.is_empty() {
        None
    } else {
        use anyhow::Context;

        std::fs::create_dir_all(&config.directory)
            .with_context(|| format!("Failed to create log directory: {}", config.directory))?;
        let appender = tracing_appender::rolling::daily(&config.directory, "pulsebind.log");
        let (non_blocking, guard) = tracing_appender::non_blocking(appender);
        let file_filter = EnvFilter::try_new(&filter)
            .map_err(|e| anyhow!("invalid log filter '{}': {}", filter, e))?;
        layers.push(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .json()
                .with_filter(file_filter)
                .boxed(),
        );
        Some(guard)
    };

    Registry::default()
        .with(layers)
        .try_init()
        .map_err(|e| anyhow!("failed to install tracing subscriber: {}", e))?;

    Ok(LoggingGuard {
        #[cfg(feature = "file-logging")]
        _file_guard: file_guard,
        filter,
    })
}

/// Initialize logging with default settings
pub fn init_logging_default(debug_flags: &CrateDebugFlags) -> Result<LoggingGuard> {
    init_logging(debug_flags, &LoggingConfig::default())
}
