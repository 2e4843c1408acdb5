// Copyright 2025 IRuby Developers
// SPDX-License-Identifier: Apache-2.0

//! # iruby-observability
//!
//! Logging setup shared by the IRuby crates and tools, with per-crate debug
//! flag support (`--debug-iruby-session-adapter`, `IRUBY_DEBUG=all`, ...).

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod cli;
pub mod init;

pub use cli::*;
pub use init::*;

/// Known IRuby crate names for debug flags
pub const KNOWN_CRATES: &[&str] = &[
    "iruby",
    "iruby-config",
    "iruby-observability",
    "iruby-session-adapter",
];
