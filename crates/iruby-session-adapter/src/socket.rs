// Copyright 2025 IRuby Developers
// SPDX-License-Identifier: Apache-2.0

//! Socket patterns, endpoints and the handle returned by adapters

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::error::{SocketError, SocketResult};

/// Communication role of a kernel socket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SocketPattern {
    /// shell, control and stdin channels
    Router,
    /// iopub channel
    Pub,
    /// heartbeat channel
    Rep,
}

impl SocketPattern {
    pub fn as_str(&self) -> &'static str {
        match self {
            SocketPattern::Router => "ROUTER",
            SocketPattern::Pub => "PUB",
            SocketPattern::Rep => "REP",
        }
    }

    /// PUB sockets are send-only
    pub fn can_receive(&self) -> bool {
        !matches!(self, SocketPattern::Pub)
    }
}

impl fmt::Display for SocketPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Transport scheme of an endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Protocol {
    Tcp,
    Ipc,
}

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Tcp => "tcp",
            Protocol::Ipc => "ipc",
        }
    }
}

impl FromStr for Protocol {
    type Err = SocketError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "tcp" => Ok(Protocol::Tcp),
            "ipc" => Ok(Protocol::Ipc),
            other => Err(SocketError::InvalidEndpoint(format!(
                "unsupported protocol '{}' (expected tcp or ipc)",
                other
            ))),
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a socket should be bound
///
/// IPC endpoints follow the Jupyter naming convention: the "host" is a path
/// prefix and the "port" a numeric suffix, giving `ipc://<host>-<port>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    protocol: Protocol,
    host: String,
    port: u16,
}

impl Endpoint {
    pub fn new(protocol: &str, host: &str, port: u16) -> SocketResult<Self> {
        if host.is_empty() {
            return Err(SocketError::InvalidEndpoint("host cannot be empty".to_string()));
        }
        Ok(Self {
            protocol: protocol.parse()?,
            host: host.to_string(),
            port,
        })
    }

    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Port 0 asks for an automatically assigned port
    pub fn is_wildcard(&self) -> bool {
        self.port == 0
    }

    /// Replace a wildcard IPC port with the first suffix whose path is free
    ///
    /// TCP endpoints are returned unchanged; the transport assigns their port
    /// during bind.
    pub fn prepare_for_bind(&self) -> Endpoint {
        if self.protocol != Protocol::Ipc || !self.is_wildcard() {
            return self.clone();
        }
        let port = (1..=u16::MAX)
            .find(|candidate| !Path::new(&format!("{}-{}", self.host, candidate)).exists())
            .unwrap_or(u16::MAX);
        Endpoint {
            port,
            ..self.clone()
        }
    }

    /// Address in libzmq syntax, wildcard TCP ports written as `*`
    pub fn bind_address(&self) -> String {
        match self.protocol {
            Protocol::Tcp if self.is_wildcard() => format!("tcp://{}:*", self.host),
            _ => self.socket_address(),
        }
    }

    /// Address with the literal port, wildcard TCP ports written as `0`
    pub fn socket_address(&self) -> String {
        match self.protocol {
            Protocol::Tcp => format!("tcp://{}:{}", self.host, self.port),
            Protocol::Ipc => format!("ipc://{}-{}", self.host, self.port),
        }
    }

    /// Port actually bound, given the transport's last-endpoint report
    ///
    /// # Errors
    ///
    /// Returns `SocketError::InvalidEndpoint` if a TCP endpoint carries no port.
    pub fn resolve_port(&self, last_endpoint: &str) -> SocketResult<u16> {
        match self.protocol {
            Protocol::Ipc => Ok(self.port),
            Protocol::Tcp => last_endpoint
                .rsplit_once(':')
                .and_then(|(_, port)| port.trim_end_matches('\0').parse::<u16>().ok())
                .ok_or_else(|| {
                    SocketError::InvalidEndpoint(format!(
                        "no port in bound endpoint '{}'",
                        last_endpoint
                    ))
                }),
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.socket_address())
    }
}

/// A live, bound socket owned by the caller
///
/// Frames are raw bytes; message framing and signing happen above this layer.
pub trait SessionSocket: Send {
    fn pattern(&self) -> SocketPattern;

    /// Endpoint the transport reports after binding
    fn last_endpoint(&self) -> &str;

    /// Send one multipart message
    fn send_multipart(&mut self, frames: &[&[u8]]) -> SocketResult<()>;

    /// Block until one multipart message arrives
    fn recv_multipart(&mut self) -> SocketResult<Vec<Vec<u8>>>;
}

impl fmt::Debug for dyn SessionSocket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionSocket")
            .field("pattern", &self.pattern())
            .field("last_endpoint", &self.last_endpoint())
            .finish()
    }
}

/// A socket together with the port it is bound to
pub type BoundSocket = (Box<dyn SessionSocket>, u16);

pub(crate) fn ensure_can_receive(pattern: SocketPattern) -> SocketResult<()> {
    if pattern.can_receive() {
        Ok(())
    } else {
        Err(SocketError::Unsupported {
            pattern,
            operation: "receive",
        })
    }
}

pub(crate) fn ensure_frames(frames: &[&[u8]]) -> SocketResult<()> {
    if frames.is_empty() {
        return Err(SocketError::SendFailed(
            "a message needs at least one frame".to_string(),
        ));
    }
    Ok(())
}
