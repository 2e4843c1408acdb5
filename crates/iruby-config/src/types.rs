// Copyright 2025 IRuby Developers
// SPDX-License-Identifier: Apache-2.0

//! Configuration type definitions
//!
//! This module defines the configuration structs that map to sections in
//! `iruby_configuration.toml`, plus the Jupyter connection info that is
//! handed to the selected session adapter.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::{ConfigError, ConfigResult};

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct IrubyConfig {
    pub session: SessionConfig,
    pub logging: LoggingConfig,
    pub connection: ConnectionConfig,
}

/// Session adapter selection
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Forces a specific adapter (e.g. `"cztop"`). `None` = first available.
    pub adapter: Option<String>,
    /// Jupyter connection file to read `connection` from.
    pub connection_file: Option<PathBuf>,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// Crates logged at debug level regardless of `level`
    pub debug_crates: Vec<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            debug_crates: Vec::new(),
        }
    }
}

/// The five kernel channels of the Jupyter messaging protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KernelChannel {
    Shell,
    Control,
    Stdin,
    IoPub,
    Heartbeat,
}

impl KernelChannel {
    pub const ALL: [KernelChannel; 5] = [
        KernelChannel::Shell,
        KernelChannel::Control,
        KernelChannel::Stdin,
        KernelChannel::IoPub,
        KernelChannel::Heartbeat,
    ];

    /// Field name of the channel's port in a connection file
    pub fn port_key(&self) -> &'static str {
        match self {
            KernelChannel::Shell => "shell_port",
            KernelChannel::Control => "control_port",
            KernelChannel::Stdin => "stdin_port",
            KernelChannel::IoPub => "iopub_port",
            KernelChannel::Heartbeat => "hb_port",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            KernelChannel::Shell => "shell",
            KernelChannel::Control => "control",
            KernelChannel::Stdin => "stdin",
            KernelChannel::IoPub => "iopub",
            KernelChannel::Heartbeat => "heartbeat",
        }
    }
}

impl fmt::Display for KernelChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Jupyter connection info
///
/// Mirrors the JSON connection file a Jupyter frontend writes before launching
/// the kernel. A port of 0 asks the transport to pick one.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ConnectionConfig {
    pub transport: String,
    pub ip: String,
    pub shell_port: u16,
    pub control_port: u16,
    pub stdin_port: u16,
    pub iopub_port: u16,
    pub hb_port: u16,
    pub key: String,
    pub signature_scheme: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kernel_name: Option<String>,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            transport: "tcp".to_string(),
            ip: "127.0.0.1".to_string(),
            shell_port: 0,
            control_port: 0,
            stdin_port: 0,
            iopub_port: 0,
            hb_port: 0,
            key: String::new(),
            signature_scheme: "hmac-sha256".to_string(),
            kernel_name: None,
        }
    }
}

impl ConnectionConfig {
    /// Load a Jupyter connection file
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::IoError` if the file cannot be read and
    /// `ConfigError::ConnectionFile` if it is not valid connection JSON.
    pub fn from_connection_file(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content).map_err(|e| ConfigError::ConnectionFile {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Parse connection info from its JSON representation
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serialize to the JSON layout of a connection file
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn port(&self, channel: KernelChannel) -> u16 {
        match channel {
            KernelChannel::Shell => self.shell_port,
            KernelChannel::Control => self.control_port,
            KernelChannel::Stdin => self.stdin_port,
            KernelChannel::IoPub => self.iopub_port,
            KernelChannel::Heartbeat => self.hb_port,
        }
    }

    pub fn set_port(&mut self, channel: KernelChannel, port: u16) {
        match channel {
            KernelChannel::Shell => self.shell_port = port,
            KernelChannel::Control => self.control_port = port,
            KernelChannel::Stdin => self.stdin_port = port,
            KernelChannel::IoPub => self.iopub_port = port,
            KernelChannel::Heartbeat => self.hb_port = port,
        }
    }

    /// All channel ports in protocol order
    pub fn all_ports(&self) -> Vec<(KernelChannel, u16)> {
        KernelChannel::ALL
            .iter()
            .map(|channel| (*channel, self.port(*channel)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const JUPYTER_CONNECTION: &str = r#"{
        "shell_port": 53794,
        "iopub_port": 53795,
        "stdin_port": 53796,
        "control_port": 53797,
        "hb_port": 53798,
        "ip": "127.0.0.1",
        "key": "a0436f6c-1916-498b-8eb9-e81ab9368e84",
        "transport": "tcp",
        "signature_scheme": "hmac-sha256",
        "kernel_name": "ruby3"
    }"#;

    #[test]
    fn test_parse_jupyter_connection_json() {
        let config = ConnectionConfig::from_json(JUPYTER_CONNECTION).unwrap();
        assert_eq!(config.shell_port, 53794);
        assert_eq!(config.hb_port, 53798);
        assert_eq!(config.key, "a0436f6c-1916-498b-8eb9-e81ab9368e84");
        assert_eq!(config.kernel_name.as_deref(), Some("ruby3"));
    }

    #[test]
    fn test_partial_connection_json_uses_defaults() {
        let config = ConnectionConfig::from_json(r#"{"ip": "0.0.0.0"}"#).unwrap();
        assert_eq!(config.ip, "0.0.0.0");
        assert_eq!(config.transport, "tcp");
        assert_eq!(config.shell_port, 0);
    }

    #[test]
    fn test_from_connection_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(JUPYTER_CONNECTION.as_bytes()).unwrap();

        let config = ConnectionConfig::from_connection_file(file.path()).unwrap();
        assert_eq!(config.iopub_port, 53795);
    }

    #[test]
    fn test_malformed_connection_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"{ not json").unwrap();

        let err = ConnectionConfig::from_connection_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::ConnectionFile { .. }));
    }

    #[test]
    fn test_set_port_per_channel() {
        let mut config = ConnectionConfig::default();
        for (offset, channel) in KernelChannel::ALL.iter().enumerate() {
            config.set_port(*channel, 9000 + offset as u16);
        }
        assert_eq!(config.shell_port, 9000);
        assert_eq!(config.control_port, 9001);
        assert_eq!(config.stdin_port, 9002);
        assert_eq!(config.iopub_port, 9003);
        assert_eq!(config.hb_port, 9004);
    }

    #[test]
    fn test_json_omits_missing_kernel_name() {
        let json = ConnectionConfig::default().to_json().unwrap();
        assert!(!json.contains("kernel_name"));
        assert!(json.contains("\"hb_port\": 0"));
    }
}
