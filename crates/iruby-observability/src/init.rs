// Copyright 2025 IRuby Developers
// SPDX-License-Identifier: Apache-2.0

//! Unified logging initialization
//!
//! Logs go to stderr; a kernel's stdout belongs to the frontend.

use anyhow::{anyhow, Context, Result};
use iruby_config::LoggingConfig;
use tracing_subscriber::EnvFilter;

use crate::cli::CrateDebugFlags;

/// Build the `EnvFilter` directive string for a logging config plus debug flags
///
/// Crates listed in `logging.debug_crates` are treated like `--debug-<crate>` flags.
pub fn filter_directives(config: &LoggingConfig, debug_flags: &CrateDebugFlags) -> String {
    let mut flags = debug_flags.clone();
    for crate_name in &config.debug_crates {
        flags.enable(crate_name);
    }
    flags.to_filter_string(&config.level.to_lowercase())
}

/// Initialize console logging
///
/// # Errors
///
/// Fails if the filter cannot be parsed or a global subscriber is already installed.
pub fn init_logging(config: &LoggingConfig, debug_flags: &CrateDebugFlags) -> Result<()> {
    let directives = filter_directives(config, debug_flags);
    let env_filter = EnvFilter::try_new(&directives)
        .with_context(|| format!("Invalid log filter: {}", directives))?;

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .try_init()
        .map_err(|e| anyhow!("Failed to install tracing subscriber: {}", e))?;

    tracing::debug!(filter = %directives, "logging initialized");
    Ok(())
}
