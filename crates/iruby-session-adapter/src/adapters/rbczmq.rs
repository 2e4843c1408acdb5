// Copyright 2025 IRuby Developers
// SPDX-License-Identifier: Apache-2.0

//! `rbczmq`: libzmq through the `zmq` crate

use std::sync::Arc;

use iruby_config::ConnectionConfig;

use crate::adapter::{AdapterClass, SessionAdapter};
use crate::error::SessionAdapterResult;
use crate::probe::DependencyError;

#[cfg(feature = "zmq")]
use crate::error::{SocketError, SocketResult};
#[cfg(feature = "zmq")]
use crate::socket::{ensure_can_receive, ensure_frames, BoundSocket, Endpoint, SessionSocket, SocketPattern};

/// Oldest libzmq major version the `zmq` crate bindings work with
#[cfg(feature = "zmq")]
const MIN_LIBZMQ_MAJOR: i32 = 3;

#[derive(Debug, Clone, Copy, Default)]
pub struct RbczmqAdapter;

impl RbczmqAdapter {
    pub const NAME: &'static str = "rbczmq";
}

impl AdapterClass for RbczmqAdapter {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    #[cfg(feature = "zmq")]
    fn load_requirements(&self) -> Result<(), DependencyError> {
        let (major, minor, patch) = zmq::version();
        if major < MIN_LIBZMQ_MAJOR {
            return Err(DependencyError::VersionTooOld {
                library: "libzmq".to_string(),
                found: format!("{}.{}.{}", major, minor, patch),
                required: format!("{}.0.0", MIN_LIBZMQ_MAJOR),
            });
        }
        Ok(())
    }

    #[cfg(not(feature = "zmq"))]
    fn load_requirements(&self) -> Result<(), DependencyError> {
        Err(DependencyError::NotCompiled { feature: "zmq" })
    }

    #[cfg(feature = "zmq")]
    fn instantiate(
        &self,
        config: Arc<ConnectionConfig>,
    ) -> SessionAdapterResult<Box<dyn SessionAdapter>> {
        Ok(Box::new(RbczmqSession::new(config)))
    }

    #[cfg(not(feature = "zmq"))]
    fn instantiate(
        &self,
        _config: Arc<ConnectionConfig>,
    ) -> SessionAdapterResult<Box<dyn SessionAdapter>> {
        Err(crate::error::SessionAdapterError::InstantiationFailed {
            name: Self::NAME,
            reason: DependencyError::NotCompiled { feature: "zmq" },
        })
    }
}

/// One kernel session on a shared `zmq::Context`
#[cfg(feature = "zmq")]
pub struct RbczmqSession {
    config: Arc<ConnectionConfig>,
    context: zmq::Context,
}

#[cfg(feature = "zmq")]
impl RbczmqSession {
    pub fn new(config: Arc<ConnectionConfig>) -> Self {
        Self {
            config,
            context: zmq::Context::new(),
        }
    }
}

#[cfg(feature = "zmq")]
impl SessionAdapter for RbczmqSession {
    fn name(&self) -> &'static str {
        RbczmqAdapter::NAME
    }

    fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    fn make_socket(&mut self, pattern: SocketPattern, endpoint: &Endpoint) -> SocketResult<BoundSocket> {
        let kind = match pattern {
            SocketPattern::Router => zmq::ROUTER,
            SocketPattern::Pub => zmq::PUB,
            SocketPattern::Rep => zmq::REP,
        };
        let socket = self.context.socket(kind)?;
        socket.set_linger(0)?;

        let address = endpoint.bind_address();
        socket.bind(&address).map_err(|e| SocketError::BindFailed {
            address: address.clone(),
            message: e.to_string(),
        })?;

        let last_endpoint = socket.get_last_endpoint()?.map_err(|raw| {
            SocketError::InvalidEndpoint(String::from_utf8_lossy(&raw).into_owned())
        })?;
        let port = endpoint.resolve_port(&last_endpoint)?;

        Ok((
            Box::new(RbczmqSocket {
                socket,
                pattern,
                last_endpoint,
            }),
            port,
        ))
    }
}

#[cfg(feature = "zmq")]
struct RbczmqSocket {
    socket: zmq::Socket,
    pattern: SocketPattern,
    last_endpoint: String,
}

#[cfg(feature = "zmq")]
impl SessionSocket for RbczmqSocket {
    fn pattern(&self) -> SocketPattern {
        self.pattern
    }

    fn last_endpoint(&self) -> &str {
        &self.last_endpoint
    }

    fn send_multipart(&mut self, frames: &[&[u8]]) -> SocketResult<()> {
        ensure_frames(frames)?;
        self.socket
            .send_multipart(frames.iter().copied(), 0)
            .map_err(|e| SocketError::SendFailed(e.to_string()))
    }

    fn recv_multipart(&mut self) -> SocketResult<Vec<Vec<u8>>> {
        ensure_can_receive(self.pattern)?;
        self.socket
            .recv_multipart(0)
            .map_err(|e| SocketError::ReceiveFailed(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name() {
        assert_eq!(RbczmqAdapter.name(), "rbczmq");
    }

    #[cfg(not(feature = "zmq"))]
    #[test]
    fn test_unavailable_without_feature() {
        let availability = RbczmqAdapter.available();
        assert_eq!(
            availability.reason(),
            Some(&DependencyError::NotCompiled { feature: "zmq" })
        );
        assert!(RbczmqAdapter
            .instantiate(Arc::new(ConnectionConfig::default()))
            .is_err());
    }

    #[cfg(feature = "zmq")]
    #[test]
    fn test_router_wildcard_port() {
        assert!(RbczmqAdapter.available().is_available());
        let mut session = RbczmqAdapter
            .instantiate(Arc::new(ConnectionConfig::default()))
            .unwrap();

        let (socket, port) = session.make_router_socket("tcp", "127.0.0.1", 0).unwrap();

        assert_ne!(port, 0);
        assert_eq!(socket.last_endpoint(), format!("tcp://127.0.0.1:{}", port));
        assert_eq!(socket.pattern(), SocketPattern::Router);
    }

    #[cfg(feature = "zmq")]
    #[test]
    fn test_rep_roundtrip() {
        let mut session = RbczmqSession::new(Arc::new(ConnectionConfig::default()));
        let (mut rep, port) = session.make_rep_socket("tcp", "127.0.0.1", 0).unwrap();

        let context = zmq::Context::new();
        let req = context.socket(zmq::REQ).unwrap();
        req.connect(&format!("tcp://127.0.0.1:{}", port)).unwrap();
        req.send("ping", 0).unwrap();

        assert_eq!(rep.recv_multipart().unwrap(), vec![b"ping".to_vec()]);
        rep.send_multipart(&[b"pong".as_slice()]).unwrap();
        assert_eq!(req.recv_bytes(0).unwrap(), b"pong".to_vec());
    }
}
