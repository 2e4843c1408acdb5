// Copyright 2025 IRuby Developers
// SPDX-License-Identifier: Apache-2.0

//! Configuration validation
//!
//! Ensures configuration values are consistent and within the set the kernel
//! understands. All problems are collected before reporting.

use crate::{ConfigError, ConfigResult, IrubyConfig};
use std::collections::HashMap;

pub const SUPPORTED_TRANSPORTS: &[&str] = &["tcp", "ipc"];
pub const SUPPORTED_SIGNATURE_SCHEMES: &[&str] = &["hmac-sha256", "hmac-sha512", "hmac-sha1", "hmac-md5"];
pub const SUPPORTED_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error", "off"];

/// Validation errors that can occur during config validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigValidationError {
    PortConflict { port1: String, port2: String, port: u16 },
    MissingRequired { field: String },
    InvalidValue { field: String, reason: String },
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PortConflict { port1, port2, port } => {
                write!(
                    f,
                    "Port conflict: {} and {} both use port {}",
                    port1, port2, port
                )
            }
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
/// Checks for:
/// - Supported transport and signature scheme
/// - Port conflicts between channels (0 is exempt, it means "pick one")
/// - Required fields
/// - Known log level
///
/// # Errors
///
/// Returns `ConfigError::ValidationError` with details if validation fails
pub fn validate_config(config: &IrubyConfig) -> ConfigResult<()> {
    let errors = collect_validation_errors(config);

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

/// Run every check and return the individual problems
pub fn collect_validation_errors(config: &IrubyConfig) -> Vec<ConfigValidationError> {
    let mut errors = Vec::new();

    validate_required_fields(config, &mut errors);
    validate_port_conflicts(config, &mut errors);
    validate_value_ranges(config, &mut errors);

    errors
}

fn validate_required_fields(config: &IrubyConfig, errors: &mut Vec<ConfigValidationError>) {
    if config.connection.ip.is_empty() {
        errors.push(ConfigValidationError::MissingRequired {
            field: "connection.ip".to_string(),
        });
    }
    if config.connection.transport.is_empty() {
        errors.push(ConfigValidationError::MissingRequired {
            field: "connection.transport".to_string(),
        });
    }
}

fn validate_port_conflicts(config: &IrubyConfig, errors: &mut Vec<ConfigValidationError>) {
    let mut seen: HashMap<u16, &'static str> = HashMap::new();

    for (channel, port) in config.connection.all_ports() {
        if port == 0 {
            continue;
        }
        match seen.get(&port) {
            Some(previous) => errors.push(ConfigValidationError::PortConflict {
                port1: format!("connection.{}", previous),
                port2: format!("connection.{}", channel.port_key()),
                port,
            }),
            None => {
                seen.insert(port, channel.port_key());
            }
        }
    }
}

fn validate_value_ranges(config: &IrubyConfig, errors: &mut Vec<ConfigValidationError>) {
    let transport = config.connection.transport.as_str();
    if !transport.is_empty() && !SUPPORTED_TRANSPORTS.contains(&transport) {
        errors.push(ConfigValidationError::InvalidValue {
            field: "connection.transport".to_string(),
            reason: format!(
                "'{}' is not one of {}",
                transport,
                SUPPORTED_TRANSPORTS.join(", ")
            ),
        });
    }

    // An empty key disables signing, so the scheme is irrelevant then
    let scheme = config.connection.signature_scheme.as_str();
    if !config.connection.key.is_empty() && !SUPPORTED_SIGNATURE_SCHEMES.contains(&scheme) {
        errors.push(ConfigValidationError::InvalidValue {
            field: "connection.signature_scheme".to_string(),
            reason: format!(
                "'{}' is not one of {}",
                scheme,
                SUPPORTED_SIGNATURE_SCHEMES.join(", ")
            ),
        });
    }

    let level = config.logging.level.to_lowercase();
    if !SUPPORTED_LOG_LEVELS.contains(&level.as_str()) {
        errors.push(ConfigValidationError::InvalidValue {
            field: "logging.level".to_string(),
            reason: format!("'{}' is not a log level", config.logging.level),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_default_config() {
        let config = IrubyConfig::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_wildcard_ports_do_not_conflict() {
        let config = IrubyConfig::default();
        assert!(collect_validation_errors(&config).is_empty());
    }

    #[test]
    fn test_port_conflict() {
        let mut config = IrubyConfig::default();
        config.connection.shell_port = 50000;
        config.connection.iopub_port = 50000;

        let errors = collect_validation_errors(&config);
        assert_eq!(
            errors,
            vec![ConfigValidationError::PortConflict {
                port1: "connection.shell_port".to_string(),
                port2: "connection.iopub_port".to_string(),
                port: 50000,
            }]
        );
    }

    #[test]
    fn test_unknown_transport() {
        let mut config = IrubyConfig::default();
        config.connection.transport = "udp".to_string();

        let result = validate_config(&config);
        assert!(matches!(result, Err(ConfigError::ValidationError(ref msg)) if msg.contains("udp")));
    }

    #[test]
    fn test_signature_scheme_only_checked_with_key() {
        let mut config = IrubyConfig::default();
        config.connection.signature_scheme = "rot13".to_string();
        assert!(validate_config(&config).is_ok());

        config.connection.key = "secret".to_string();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_collects_multiple_errors() {
        let mut config = IrubyConfig::default();
        config.connection.ip = String::new();
        config.logging.level = "loud".to_string();

        let errors = collect_validation_errors(&config);
        assert_eq!(errors.len(), 2);
    }
}
