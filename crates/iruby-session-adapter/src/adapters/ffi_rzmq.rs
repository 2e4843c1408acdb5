// Copyright 2025 IRuby Developers
// SPDX-License-Identifier: Apache-2.0

//! `ffi-rzmq`: the libzmq C API, loaded at runtime

use std::sync::Arc;

use iruby_config::ConnectionConfig;
use tracing::debug;

use crate::adapter::{AdapterClass, SessionAdapter};
use crate::error::{SessionAdapterResult, SocketResult};
use crate::probe::DependencyError;
use crate::socket::{BoundSocket, Endpoint, SocketPattern};

#[cfg(unix)]
use crate::native::{LibZmq, NativeContext, NativeSocket};
#[cfg(unix)]
use crate::socket::SessionSocket;

/// Socket options and `zmq_msg_*` calls used here need libzmq 4
#[cfg(unix)]
const MIN_LIBZMQ_MAJOR: i32 = 4;

#[derive(Debug, Clone, Copy, Default)]
pub struct FfiRzmqAdapter;

impl FfiRzmqAdapter {
    pub const NAME: &'static str = "ffi-rzmq";
}

impl AdapterClass for FfiRzmqAdapter {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    #[cfg(unix)]
    fn load_requirements(&self) -> Result<(), DependencyError> {
        LibZmq::load_with_version(MIN_LIBZMQ_MAJOR).map(|_| ())
    }

    #[cfg(not(unix))]
    fn load_requirements(&self) -> Result<(), DependencyError> {
        Err(DependencyError::UnsupportedPlatform {
            library: "libzmq".to_string(),
        })
    }

    fn instantiate(
        &self,
        config: Arc<ConnectionConfig>,
    ) -> SessionAdapterResult<Box<dyn SessionAdapter>> {
        Ok(Box::new(FfiRzmqSession::new(config)))
    }
}

/// One kernel session owning a libzmq context
///
/// The library and context are set up by the first `make_socket` call.
pub struct FfiRzmqSession {
    config: Arc<ConnectionConfig>,
    #[cfg(unix)]
    context: Option<Arc<NativeContext>>,
}

impl FfiRzmqSession {
    pub fn new(config: Arc<ConnectionConfig>) -> Self {
        Self {
            config,
            #[cfg(unix)]
            context: None,
        }
    }

    #[cfg(unix)]
    fn context(&mut self) -> SocketResult<Arc<NativeContext>> {
        if let Some(context) = &self.context {
            return Ok(Arc::clone(context));
        }
        let lib = Arc::new(LibZmq::load_with_version(MIN_LIBZMQ_MAJOR)?);
        let (major, minor, patch) = lib.version();
        debug!(adapter = FfiRzmqAdapter::NAME, "libzmq {}.{}.{} loaded", major, minor, patch);

        let context = Arc::new(NativeContext::new(lib)?);
        self.context = Some(Arc::clone(&context));
        Ok(context)
    }
}

impl SessionAdapter for FfiRzmqSession {
    fn name(&self) -> &'static str {
        FfiRzmqAdapter::NAME
    }

    fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    #[cfg(unix)]
    fn make_socket(&mut self, pattern: SocketPattern, endpoint: &Endpoint) -> SocketResult<BoundSocket> {
        let context = self.context()?;
        let socket = NativeSocket::bind(&context, pattern, &endpoint.bind_address())?;
        let port = endpoint.resolve_port(socket.last_endpoint())?;
        Ok((Box::new(socket), port))
    }

    #[cfg(not(unix))]
    fn make_socket(&mut self, _pattern: SocketPattern, _endpoint: &Endpoint) -> SocketResult<BoundSocket> {
        debug!(adapter = FfiRzmqAdapter::NAME, "native sockets need a unix platform");
        Err(DependencyError::UnsupportedPlatform {
            library: "libzmq".to_string(),
        }
        .into())
    }
}
