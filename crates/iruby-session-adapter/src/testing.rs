// Copyright 2025 IRuby Developers
// SPDX-License-Identifier: Apache-2.0

//! In-memory adapters for exercising selection and channel wiring without a
//! ZeroMQ library.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU16, AtomicUsize, Ordering};
use std::sync::Arc;

use iruby_config::ConnectionConfig;

use crate::adapter::{AdapterClass, SessionAdapter};
use crate::error::{SessionAdapterResult, SocketError, SocketResult};
use crate::probe::DependencyError;
use crate::registry::AdapterRegistry;
use crate::socket::{ensure_can_receive, ensure_frames, BoundSocket, Endpoint, SessionSocket, SocketPattern};

/// Adapter class with a fixed probe outcome that counts how often it is probed
#[derive(Debug)]
pub struct MockAdapterClass {
    name: &'static str,
    available: bool,
    probes: AtomicUsize,
}

impl MockAdapterClass {
    pub fn new(name: &'static str, available: bool) -> Arc<Self> {
        Arc::new(Self {
            name,
            available,
            probes: AtomicUsize::new(0),
        })
    }

    /// Number of `load_requirements` calls so far
    pub fn probe_count(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }
}

impl AdapterClass for MockAdapterClass {
    fn name(&self) -> &'static str {
        self.name
    }

    fn load_requirements(&self) -> Result<(), DependencyError> {
        self.probes.fetch_add(1, Ordering::SeqCst);
        if self.available {
            Ok(())
        } else {
            Err(DependencyError::LibraryNotFound {
                library: format!("lib{}", self.name),
                message: "not installed".to_string(),
            })
        }
    }

    fn instantiate(
        &self,
        config: Arc<ConnectionConfig>,
    ) -> SessionAdapterResult<Box<dyn SessionAdapter>> {
        Ok(Box::new(MockSession::new(self.name, config)))
    }
}

/// Registry over mock classes, in the given order
///
/// # Panics
///
/// Panics if two mocks share a name.
pub fn registry_of(classes: &[&Arc<MockAdapterClass>]) -> AdapterRegistry {
    AdapterRegistry::new(
        classes
            .iter()
            .map(|class| Arc::clone(class) as Arc<dyn AdapterClass>),
    )
    .expect("mock adapter names must be unique")
}

/// Session that "binds" by handing out ports from a counter
#[derive(Debug)]
pub struct MockSession {
    name: &'static str,
    config: Arc<ConnectionConfig>,
    next_port: AtomicU16,
}

impl MockSession {
    pub const FIRST_ASSIGNED_PORT: u16 = 40000;

    pub fn new(name: &'static str, config: Arc<ConnectionConfig>) -> Self {
        Self {
            name,
            config,
            next_port: AtomicU16::new(Self::FIRST_ASSIGNED_PORT),
        }
    }
}

impl SessionAdapter for MockSession {
    fn name(&self) -> &'static str {
        self.name
    }

    fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    fn make_socket(&mut self, pattern: SocketPattern, endpoint: &Endpoint) -> SocketResult<BoundSocket> {
        let port = if endpoint.is_wildcard() {
            self.next_port.fetch_add(1, Ordering::SeqCst)
        } else {
            endpoint.port()
        };
        let last_endpoint = format!("{}://{}:{}", endpoint.protocol(), endpoint.host(), port);
        Ok((
            Box::new(MockSocket {
                pattern,
                last_endpoint,
                queue: VecDeque::new(),
            }),
            port,
        ))
    }
}

/// Loopback socket: whatever is sent can be received again
#[derive(Debug)]
pub struct MockSocket {
    pattern: SocketPattern,
    last_endpoint: String,
    queue: VecDeque<Vec<Vec<u8>>>,
}

impl SessionSocket for MockSocket {
    fn pattern(&self) -> SocketPattern {
        self.pattern
    }

    fn last_endpoint(&self) -> &str {
        &self.last_endpoint
    }

    fn send_multipart(&mut self, frames: &[&[u8]]) -> SocketResult<()> {
        ensure_frames(frames)?;
        self.queue
            .push_back(frames.iter().map(|frame| frame.to_vec()).collect());
        Ok(())
    }

    fn recv_multipart(&mut self) -> SocketResult<Vec<Vec<u8>>> {
        ensure_can_receive(self.pattern)?;
        self.queue
            .pop_front()
            .ok_or_else(|| SocketError::ReceiveFailed("no queued message".to_string()))
    }
}
