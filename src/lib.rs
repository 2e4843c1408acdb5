// Copyright 2025 IRuby Developers
// SPDX-License-Identifier: Apache-2.0

//! # IRuby session layer
//!
//! Umbrella crate over the pieces a kernel needs before it can speak the
//! Jupyter protocol:
//!
//! - **`config`**: `iruby_configuration.toml`, connection files, environment overrides
//! - **`observability`**: `tracing` subscriber setup and per-crate debug flags
//! - **`session_adapter`**: ZeroMQ backend probing, selection and socket construction
//!
//! ## Feature Flags
//!
//! - **`zeromq`** (default): the pure-Rust `pyzmq` backend
//! - **`zmq`**: the `rbczmq` backend, linking libzmq at build time
//!
//! The `cztop` and `ffi-rzmq` backends load their libraries at runtime and are
//! always compiled.
//!
//! ## Example
//!
//! ```rust,no_run
//! use iruby::prelude::*;
//!
//! let config = load_config(None, None)?;
//! init_logging(&config.logging, &parse_debug_flags())?;
//!
//! let mut adapter = open_session(&config)?;
//! let channels = KernelChannels::bind(adapter.as_mut())?;
//! println!("{}", channels.resolved_connection().to_json()?);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub use iruby_config as config;
pub use iruby_observability as observability;
pub use iruby_session_adapter as session_adapter;

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for convenient imports
pub mod prelude {
    pub use iruby_config::{load_config, ConnectionConfig, IrubyConfig, KernelChannel};
    pub use iruby_observability::{init_logging, parse_debug_flags, CrateDebugFlags};
    pub use iruby_session_adapter::{
        open_session, select_adapter_class, select_adapter_class_from_env, AdapterClass,
        AdapterRegistry, Availability, KernelChannels, SessionAdapter, SessionAdapterError,
        SessionSocket, SocketPattern,
    };
}
