// Copyright 2025 IRuby Developers
// SPDX-License-Identifier: Apache-2.0

//! # iruby-session-adapter
//!
//! Picks the ZeroMQ backend a kernel session talks through and creates the
//! sockets that carry the Jupyter channels.
//!
//! Several backends can provide the same sockets. Which ones work depends on
//! what is installed, so each backend is probed at runtime:
//!
//! - `rbczmq`: libzmq through the `zmq` crate (`zmq` feature)
//! - `cztop`: CZMQ, opened with `dlopen`
//! - `ffi-rzmq`: libzmq, opened with `dlopen`
//! - `pyzmq`: the pure-Rust `zeromq` engine (`zeromq` feature, on by default)
//!
//! ## Resolution
//!
//! If `IRUBY_SESSION_ADAPTER` names a backend, that backend is used, and an
//! unavailable one is an error rather than a reason to fall back. Otherwise
//! the first available backend in the order above wins.
//!
//! ```no_run
//! use iruby_session_adapter::{select_adapter_class_from_env, AdapterRegistry};
//! use iruby_config::ConnectionConfig;
//! use std::sync::Arc;
//!
//! let class = select_adapter_class_from_env(AdapterRegistry::builtin())?;
//! let mut adapter = class.instantiate(Arc::new(ConnectionConfig::default()))?;
//!
//! let (shell, port) = adapter.make_router_socket("tcp", "127.0.0.1", 0)?;
//! println!("shell bound on {} (port {})", shell.last_endpoint(), port);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Binding a whole session
//!
//! ```no_run
//! use iruby_config::load_config;
//! use iruby_session_adapter::{open_session, KernelChannels};
//!
//! let config = load_config(None, None)?;
//! let mut adapter = open_session(&config)?;
//! let channels = KernelChannels::bind(adapter.as_mut())?;
//!
//! println!("{}", channels.resolved_connection().to_json()?);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod adapter;
pub mod adapters;
pub mod channels;
pub mod error;
pub mod probe;
pub mod registry;
pub mod resolver;
pub mod socket;

#[cfg(unix)]
mod native;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use adapter::{AdapterClass, SessionAdapter};
pub use adapters::{CztopAdapter, FfiRzmqAdapter, PyzmqAdapter, RbczmqAdapter};
pub use channels::{ChannelSocket, KernelChannels};
pub use error::{SessionAdapterError, SessionAdapterResult, SocketError, SocketResult};
pub use probe::{Availability, DependencyError};
pub use registry::{AdapterRegistry, AdapterStatus};
pub use resolver::{open_session, select_adapter_class, select_adapter_class_from_env};
pub use socket::{BoundSocket, Endpoint, Protocol, SessionSocket, SocketPattern};
