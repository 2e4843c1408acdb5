// Copyright 2025 IRuby Developers
// SPDX-License-Identifier: Apache-2.0

//! CLI argument parsing for per-crate debug flags
//!
//! Supports flags like `--debug-iruby-session-adapter` to raise a single crate
//! to debug level without touching the rest.

use std::collections::BTreeSet;
use std::env;

use crate::KNOWN_CRATES;

/// Environment variable listing crates to debug (comma-separated or `all`)
pub const DEBUG_ENV: &str = "IRUBY_DEBUG";

/// Parse debug flags from command-line arguments
///
/// # Example
/// ```rust
/// use iruby_observability::CrateDebugFlags;
///
/// let flags = CrateDebugFlags::from_args(vec!["--debug-iruby-config".to_string()]);
/// assert!(flags.is_enabled("iruby-config"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrateDebugFlags {
    pub enabled_crates: BTreeSet<String>,
}

impl CrateDebugFlags {
    /// Parse debug flags from command-line arguments
    ///
    /// Looks for arguments matching `--debug-{crate-name}` pattern.
    /// Also supports `--debug-all` to enable all known crates.
    pub fn from_args<I>(args: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        let mut flags = CrateDebugFlags::default();

        for arg in args {
            if arg == "--debug-all" {
                flags.enable_all();
                continue;
            }

            if let Some(crate_name) = arg.strip_prefix("--debug-") {
                flags.enable(crate_name);
            }
        }

        flags
    }

    /// Parse a comma-separated crate list such as `IRUBY_DEBUG` holds
    pub fn from_list(list: &str) -> Self {
        let mut flags = CrateDebugFlags::default();
        if list.trim() == "all" {
            flags.enable_all();
            return flags;
        }
        for crate_name in list.split(',') {
            flags.enable(crate_name);
        }
        flags
    }

    pub fn enable(&mut self, crate_name: &str) {
        let crate_name = crate_name.trim();
        if !crate_name.is_empty() {
            self.enabled_crates.insert(crate_name.to_string());
        }
    }

    pub fn enable_all(&mut self) {
        for crate_name in KNOWN_CRATES {
            self.enable(crate_name);
        }
    }

    /// Merge another set of flags into this one
    pub fn merge(&mut self, other: &CrateDebugFlags) {
        self.enabled_crates
            .extend(other.enabled_crates.iter().cloned());
    }

    /// Check if debug is enabled for a specific crate
    pub fn is_enabled(&self, crate_name: &str) -> bool {
        self.enabled_crates.contains(crate_name)
    }

    /// Create a tracing filter from debug flags
    ///
    /// Crate names are converted to their tracing targets (`-` becomes `_`).
    /// Format: `"iruby_config=debug,<default_level>"`.
    pub fn to_filter_string(&self, default_level: &str) -> String {
        let mut filters: Vec<String> = self
            .enabled_crates
            .iter()
            .map(|crate_name| format!("{}=debug", crate_name.replace('-', "_")))
            .collect();
        filters.push(default_level.to_string());
        filters.join(",")
    }
}

/// Parse debug flags from process arguments and `IRUBY_DEBUG`
pub fn parse_debug_flags() -> CrateDebugFlags {
    let mut flags = CrateDebugFlags::from_args(env::args());

    if let Ok(env_var) = env::var(DEBUG_ENV) {
        flags.merge(&CrateDebugFlags::from_list(&env_var));
    }

    flags
}

/// Generate help text for debug flags
pub fn debug_flags_help() -> String {
    format!(
        r#"Debug Flags:
  --debug-all                    Enable debug logging for all crates
  --debug-{{crate-name}}          Enable debug logging for specific crate

Available crates:
  {}

Environment Variable:
  {}={{crate-name}}[,{{crate-name}}]  Enable debug for crates (comma-separated)
  {}=all                               Enable debug for all crates
"#,
        KNOWN_CRATES.join(", "),
        DEBUG_ENV,
        DEBUG_ENV,
    )
}
