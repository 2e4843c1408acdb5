// Copyright 2025 IRuby Developers
// SPDX-License-Identifier: Apache-2.0

//! `cztop`: CZMQ `zsock` sockets, loaded at runtime

use std::sync::Arc;

use iruby_config::ConnectionConfig;

use crate::adapter::{AdapterClass, SessionAdapter};
use crate::error::{SessionAdapterResult, SocketResult};
use crate::probe::DependencyError;
use crate::socket::{BoundSocket, Endpoint, SocketPattern};

#[cfg(unix)]
use crate::native::{CzmqSocket, LibCzmq, LibZmq};
#[cfg(unix)]
use crate::socket::SessionSocket;

#[cfg(unix)]
const MIN_CZMQ_MAJOR: i32 = 4;

#[derive(Debug, Clone, Copy, Default)]
pub struct CztopAdapter;

impl CztopAdapter {
    pub const NAME: &'static str = "cztop";
}

#[cfg(unix)]
fn load_libraries() -> Result<(LibCzmq, LibZmq), DependencyError> {
    let czmq = LibCzmq::load_with_version(MIN_CZMQ_MAJOR)?;
    // frames are read and written with libzmq directly
    let zmq = LibZmq::load()?;
    Ok((czmq, zmq))
}

impl AdapterClass for CztopAdapter {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    #[cfg(unix)]
    fn load_requirements(&self) -> Result<(), DependencyError> {
        load_libraries().map(|_| ())
    }

    #[cfg(not(unix))]
    fn load_requirements(&self) -> Result<(), DependencyError> {
        Err(DependencyError::UnsupportedPlatform {
            library: "libczmq".to_string(),
        })
    }

    fn instantiate(
        &self,
        config: Arc<ConnectionConfig>,
    ) -> SessionAdapterResult<Box<dyn SessionAdapter>> {
        Ok(Box::new(CztopSession::new(config)))
    }
}

/// One kernel session on CZMQ's process-wide context
pub struct CztopSession {
    config: Arc<ConnectionConfig>,
    #[cfg(unix)]
    libraries: Option<(Arc<LibCzmq>, Arc<LibZmq>)>,
}

impl CztopSession {
    pub fn new(config: Arc<ConnectionConfig>) -> Self {
        Self {
            config,
            #[cfg(unix)]
            libraries: None,
        }
    }

    #[cfg(unix)]
    fn libraries(&mut self) -> SocketResult<(Arc<LibCzmq>, Arc<LibZmq>)> {
        if let Some((czmq, zmq)) = &self.libraries {
            return Ok((Arc::clone(czmq), Arc::clone(zmq)));
        }
        let (czmq, zmq) = load_libraries()?;
        let loaded = (Arc::new(czmq), Arc::new(zmq));
        self.libraries = Some((Arc::clone(&loaded.0), Arc::clone(&loaded.1)));
        Ok(loaded)
    }
}

impl SessionAdapter for CztopSession {
    fn name(&self) -> &'static str {
        CztopAdapter::NAME
    }

    fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    #[cfg(unix)]
    fn make_socket(&mut self, pattern: SocketPattern, endpoint: &Endpoint) -> SocketResult<BoundSocket> {
        let (czmq, zmq) = self.libraries()?;
        let socket = CzmqSocket::bind(&czmq, &zmq, pattern, &endpoint.bind_address())?;
        let port = endpoint.resolve_port(socket.last_endpoint())?;
        Ok((Box::new(socket), port))
    }

    #[cfg(not(unix))]
    fn make_socket(&mut self, _pattern: SocketPattern, _endpoint: &Endpoint) -> SocketResult<BoundSocket> {
        Err(DependencyError::UnsupportedPlatform {
            library: "libczmq".to_string(),
        }
        .into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SocketError;

    #[test]
    fn test_name() {
        assert_eq!(CztopAdapter.name(), "cztop");
    }

    #[test]
    fn test_probe_explains_itself() {
        match CztopAdapter.available().reason() {
            None => {}
            Some(DependencyError::LibraryNotFound { library, .. }) => {
                assert!(library == "libczmq" || library == "libzmq");
            }
            Some(other) => assert!(!other.to_string().is_empty()),
        }
    }

    #[test]
    fn test_router_when_installed() {
        let mut session = CztopSession::new(Arc::new(ConnectionConfig::default()));
        let result = session.make_router_socket("tcp", "127.0.0.1", 0);

        if CztopAdapter.available().is_available() {
            let (socket, port) = result.unwrap();
            assert_ne!(port, 0);
            assert!(socket.last_endpoint().ends_with(&format!(":{}", port)));
        } else {
            assert!(matches!(result, Err(SocketError::Dependency(_))));
        }
    }
}
