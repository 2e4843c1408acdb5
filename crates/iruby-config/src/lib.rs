// Copyright 2025 IRuby Developers
// SPDX-License-Identifier: Apache-2.0

//! # IRuby Configuration System
//!
//! Type-safe configuration loader for IRuby kernel sessions with support for:
//! - TOML file parsing (`iruby_configuration.toml`)
//! - Jupyter connection files (JSON)
//! - Environment variable overrides
//! - CLI argument overrides
//!
//! ## Usage
//!
//! ```rust,no_run
//! use iruby_config::load_config;
//!
//! let config = load_config(None, None).expect("Failed to load config");
//!
//! println!("Transport: {}", config.connection.transport);
//! println!("Requested adapter: {:?}", config.session.adapter);
//! ```
//!
//! Overrides are applied in order: file, then environment, then CLI. A missing
//! configuration file is not an error; the defaults bind every channel to an
//! automatically assigned port on `127.0.0.1`.

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod loader;
pub mod types;
pub mod validation;

pub use loader::{
    apply_cli_overrides, apply_environment_overrides, find_config_file, load_config,
    CONFIG_FILE_NAME, CONFIG_PATH_ENV, CONNECTION_FILE_ENV, KERNEL_HOST_ENV,
    KERNEL_TRANSPORT_ENV, LOG_LEVEL_ENV, SESSION_ADAPTER_ENV,
};
pub use types::*;
pub use validation::{validate_config, ConfigValidationError};

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    FileNotFound(String),

    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid TOML syntax: {0}")]
    ParseError(String),

    #[error("Invalid connection file {path}: {message}")]
    ConnectionFile { path: String, message: String },

    #[error("Validation failed: {0}")]
    ValidationError(String),
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
    fn test_default_config_is_valid() {
        let config = IrubyConfig::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_toml_error_maps_to_parse_error() {
        let err: ConfigError = toml::from_str::<IrubyConfig>("[session")
            .unwrap_err()
            .into();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }
}
