// Copyright 2025 IRuby Developers
// SPDX-License-Identifier: Apache-2.0

//! Session adapter contract
//!
//! An adapter comes in two halves:
//!
//! - [`AdapterClass`]: the stateless, process-wide description of a backend. It
//!   knows its identifier, can probe whether its dependency is present, and
//!   creates session instances.
//! - [`SessionAdapter`]: one instance per kernel session, holding the connection
//!   configuration and whatever transport context the backend needs. It creates
//!   bound ROUTER, PUB and REP sockets.

use std::sync::Arc;

use iruby_config::ConnectionConfig;

use crate::error::{SessionAdapterResult, SocketResult};
use crate::probe::{Availability, DependencyError};
use crate::socket::{BoundSocket, Endpoint, SocketPattern};

/// Process-wide description of one backend
pub trait AdapterClass: Send + Sync {
    /// Identifier used as registry key and `IRUBY_SESSION_ADAPTER` value
    fn name(&self) -> &'static str;

    /// Try to bring the backend's dependency into scope
    fn load_requirements(&self) -> Result<(), DependencyError>;

    /// Probe the backend
    ///
    /// Only [`DependencyError`]s are turned into [`Availability::Unavailable`];
    /// a panic inside `load_requirements` is not caught.
    fn available(&self) -> Availability {
        Availability::from(self.load_requirements())
    }

    /// Create the session-scoped adapter. No sockets are opened here.
    fn instantiate(
        &self,
        config: Arc<ConnectionConfig>,
    ) -> SessionAdapterResult<Box<dyn SessionAdapter>>;
}

/// Session-scoped adapter instance
pub trait SessionAdapter: Send {
    fn name(&self) -> &'static str;

    /// Configuration this session was instantiated with
    fn config(&self) -> &ConnectionConfig;

    /// Create a socket of `pattern` and bind it to `endpoint`
    ///
    /// Returns the socket and the bound port, which differs from
    /// `endpoint.port()` when a wildcard was requested.
    fn make_socket(&mut self, pattern: SocketPattern, endpoint: &Endpoint)
        -> SocketResult<BoundSocket>;

    fn make_router_socket(&mut self, protocol: &str, host: &str, port: u16) -> SocketResult<BoundSocket> {
        self.open_socket(SocketPattern::Router, protocol, host, port)
    }

    fn make_pub_socket(&mut self, protocol: &str, host: &str, port: u16) -> SocketResult<BoundSocket> {
        self.open_socket(SocketPattern::Pub, protocol, host, port)
    }

    fn make_rep_socket(&mut self, protocol: &str, host: &str, port: u16) -> SocketResult<BoundSocket> {
        self.open_socket(SocketPattern::Rep, protocol, host, port)
    }

    /// Build the endpoint for `(protocol, host, port)` and hand it to [`make_socket`]
    ///
    /// [`make_socket`]: SessionAdapter::make_socket
    fn open_socket(
        &mut self,
        pattern: SocketPattern,
        protocol: &str,
        host: &str,
        port: u16,
    ) -> SocketResult<BoundSocket> {
        let endpoint = Endpoint::new(protocol, host, port)?.prepare_for_bind();
        let (socket, bound_port) = self.make_socket(pattern, &endpoint)?;
        tracing::debug!(
            adapter = self.name(),
            pattern = %pattern,
            endpoint = %socket.last_endpoint(),
            port = bound_port,
            "bound socket"
        );
        Ok((socket, bound_port))
    }
}

impl std::fmt::Debug for dyn AdapterClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("AdapterClass").field(&self.name()).finish()
    }
}

impl std::fmt::Debug for dyn SessionAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("SessionAdapter").field(&self.name()).finish()
    }
}
