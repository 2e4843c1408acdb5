// Copyright 2025 IRuby Developers
// SPDX-License-Identifier: Apache-2.0

//! Configuration file loading with override support
//!
//! This module implements the 3-tier configuration loading system:
//! 1. TOML file (base defaults)
//! 2. Environment variables (runtime overrides)
//! 3. CLI arguments (explicit user overrides)
//!
//! A connection file named by `session.connection_file` (after overrides) replaces
//! the `[connection]` section.

use crate::{ConfigError, ConfigResult, ConnectionConfig, IrubyConfig};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = "iruby_configuration.toml";
pub const CONFIG_PATH_ENV: &str = "IRUBY_CONFIG_PATH";
pub const SESSION_ADAPTER_ENV: &str = "IRUBY_SESSION_ADAPTER";
pub const LOG_LEVEL_ENV: &str = "IRUBY_LOG_LEVEL";
pub const KERNEL_HOST_ENV: &str = "IRUBY_KERNEL_HOST";
pub const KERNEL_TRANSPORT_ENV: &str = "IRUBY_KERNEL_TRANSPORT";
pub const CONNECTION_FILE_ENV: &str = "IRUBY_CONNECTION_FILE";

/// Find the IRuby configuration file
///
/// Search order:
/// 1. `IRUBY_CONFIG_PATH` environment variable
/// 2. Current working directory: `./iruby_configuration.toml`
/// 3. Up to 5 parent directories
///
/// Returns `Ok(None)` when nothing is found in the searched locations.
///
/// # Errors
///
/// Returns `ConfigError::FileNotFound` if `IRUBY_CONFIG_PATH` names a missing file
pub fn find_config_file() -> ConfigResult<Option<PathBuf>> {
    if let Ok(env_path) = env::var(CONFIG_PATH_ENV) {
        let path = PathBuf::from(env_path);
        if path.exists() {
            return Ok(Some(path));
        }
        return Err(ConfigError::FileNotFound(format!(
            "Config file specified by {} not found: {}",
            CONFIG_PATH_ENV,
            path.display()
        )));
    }

    let cwd = match env::current_dir() {
        Ok(cwd) => cwd,
        Err(_) => return Ok(None),
    };

    Ok(cwd
        .ancestors()
        .take(6)
        .map(|dir| dir.join(CONFIG_FILE_NAME))
        .find(|path| path.exists()))
}

/// Load configuration
///
/// # Arguments
///
/// * `config_path` - Optional path to config file. If `None`, the file is searched for
///   and defaults are used when none exists.
/// * `cli_args` - Optional CLI argument overrides
///
/// # Errors
///
/// Returns error if an explicitly requested file is missing, the TOML is invalid, or
/// the connection file cannot be read.
pub fn load_config(
    config_path: Option<&Path>,
    cli_args: Option<&HashMap<String, String>>,
) -> ConfigResult<IrubyConfig> {
    let config_file = match config_path {
        Some(path) => Some(path.to_path_buf()),
        None => find_config_file()?,
    };

    let mut config = match config_file {
        Some(path) => {
            let content = fs::read_to_string(&path)?;
            toml::from_str(&content)?
        }
        None => IrubyConfig::default(),
    };

    apply_environment_overrides(&mut config);

    if let Some(cli) = cli_args {
        apply_cli_overrides(&mut config, cli);
    }

    // `adapter = ""` in the file means the same as no override
    config.session.adapter = config.session.adapter.filter(|name| !name.is_empty());

    if let Some(path) = config.session.connection_file.clone() {
        config.connection = ConnectionConfig::from_connection_file(&path)?;
    }

    Ok(config)
}

/// Apply environment variable overrides to configuration
///
/// Supported environment variables:
/// - `IRUBY_SESSION_ADAPTER` -> `session.adapter`
/// - `IRUBY_CONNECTION_FILE` -> `session.connection_file`
/// - `IRUBY_LOG_LEVEL` -> `logging.level`
/// - `IRUBY_KERNEL_HOST` -> `connection.ip`
/// - `IRUBY_KERNEL_TRANSPORT` -> `connection.transport`
///
/// An empty `IRUBY_SESSION_ADAPTER` counts as unset.
pub fn apply_environment_overrides(config: &mut IrubyConfig) {
    if let Ok(value) = env::var(SESSION_ADAPTER_ENV) {
        if !value.is_empty() {
            config.session.adapter = Some(value);
        }
    }
    if let Ok(value) = env::var(CONNECTION_FILE_ENV) {
        config.session.connection_file = Some(PathBuf::from(value));
    }
    if let Ok(value) = env::var(LOG_LEVEL_ENV) {
        config.logging.level = value;
    }
    if let Ok(value) = env::var(KERNEL_HOST_ENV) {
        config.connection.ip = value;
    }
    if let Ok(value) = env::var(KERNEL_TRANSPORT_ENV) {
        config.connection.transport = value;
    }
}

/// Apply CLI argument overrides to configuration
///
/// # Arguments
///
/// * `config` - Configuration to modify
/// * `cli_args` - HashMap of CLI arguments (e.g., `{"session_adapter": "cztop"}`)
///
/// An empty `session_adapter` counts as unset, as for the environment variable.
pub fn apply_cli_overrides(config: &mut IrubyConfig, cli_args: &HashMap<String, String>) {
    if let Some(value) = cli_args.get("session_adapter").filter(|v| !v.is_empty()) {
        config.session.adapter = Some(value.clone());
    }
    if let Some(value) = cli_args.get("connection_file") {
        config.session.connection_file = Some(PathBuf::from(value));
    }
    if let Some(value) = cli_args.get("log_level") {
        config.logging.level = value.clone();
    }
    if let Some(value) = cli_args.get("kernel_host") {
        config.connection.ip = value.clone();
    }
    if let Some(value) = cli_args.get("transport") {
        config.connection.transport = value.clone();
    }
}
