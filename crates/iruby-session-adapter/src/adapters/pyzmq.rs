// Copyright 2025 IRuby Developers
// SPDX-License-Identifier: Apache-2.0

//! `pyzmq`: the pure-Rust `zeromq` engine on a private tokio runtime

use std::sync::Arc;

use iruby_config::ConnectionConfig;

use crate::adapter::{AdapterClass, SessionAdapter};
use crate::error::SessionAdapterResult;
use crate::probe::DependencyError;

#[cfg(feature = "zeromq")]
use std::future::Future;
#[cfg(feature = "zeromq")]
use std::{panic, thread};

#[cfg(feature = "zeromq")]
use tokio::runtime::{Handle, Runtime, RuntimeFlavor};
#[cfg(feature = "zeromq")]
use tokio::task::block_in_place;
#[cfg(feature = "zeromq")]
use tracing::debug;
#[cfg(feature = "zeromq")]
use zeromq::{PubSocket, RepSocket, RouterSocket, Socket, SocketRecv, SocketSend, ZmqMessage};

#[cfg(feature = "zeromq")]
use crate::error::{SocketError, SocketResult};
#[cfg(feature = "zeromq")]
use crate::socket::{ensure_can_receive, ensure_frames, BoundSocket, Endpoint, SessionSocket, SocketPattern};

#[derive(Debug, Clone, Copy, Default)]
pub struct PyzmqAdapter;

impl PyzmqAdapter {
    pub const NAME: &'static str = "pyzmq";
}

impl AdapterClass for PyzmqAdapter {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    /// Compiled in means available: the engine has no native dependency
    fn load_requirements(&self) -> Result<(), DependencyError> {
        if cfg!(feature = "zeromq") {
            Ok(())
        } else {
            Err(DependencyError::NotCompiled { feature: "zeromq" })
        }
    }

    #[cfg(feature = "zeromq")]
    fn instantiate(
        &self,
        config: Arc<ConnectionConfig>,
    ) -> SessionAdapterResult<Box<dyn SessionAdapter>> {
        Ok(Box::new(PyzmqSession::new(config)))
    }

    #[cfg(not(feature = "zeromq"))]
    fn instantiate(
        &self,
        _config: Arc<ConnectionConfig>,
    ) -> SessionAdapterResult<Box<dyn SessionAdapter>> {
        Err(crate::error::SessionAdapterError::InstantiationFailed {
            name: Self::NAME,
            reason: DependencyError::NotCompiled { feature: "zeromq" },
        })
    }
}

/// The session's private runtime
///
/// Shut down in the background on drop, so the last socket may be dropped
/// from async code.
#[cfg(feature = "zeromq")]
struct EngineRuntime {
    handle: Handle,
    runtime: Option<Runtime>,
}

#[cfg(feature = "zeromq")]
impl EngineRuntime {
    fn start() -> SocketResult<Self> {
        let runtime = Runtime::new().map_err(|e| {
            SocketError::Dependency(DependencyError::InitializationFailed {
                library: "tokio".to_string(),
                message: e.to_string(),
            })
        })?;
        Ok(Self {
            handle: runtime.handle().clone(),
            runtime: Some(runtime),
        })
    }

    /// Run `future` on the engine from synchronous code
    ///
    /// A caller on a multi-thread runtime gives up its worker for the duration.
    /// A caller on a current-thread runtime cannot, so the wait happens on a
    /// scoped helper thread instead.
    fn block_on<F>(&self, future: F) -> F::Output
    where
        F: Future + Send,
        F::Output: Send,
    {
        let handle = &self.handle;
        match Handle::try_current() {
            Ok(current) if current.runtime_flavor() == RuntimeFlavor::MultiThread => {
                block_in_place(|| handle.block_on(future))
            }
            Ok(_) => thread::scope(|scope| {
                scope
                    .spawn(move || handle.block_on(future))
                    .join()
                    .unwrap_or_else(|payload| panic::resume_unwind(payload))
            }),
            Err(_) => handle.block_on(future),
        }
    }
}

#[cfg(feature = "zeromq")]
impl Drop for EngineRuntime {
    fn drop(&mut self) {
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}

/// One kernel session; the runtime is started by the first `make_socket`
#[cfg(feature = "zeromq")]
pub struct PyzmqSession {
    config: Arc<ConnectionConfig>,
    runtime: Option<Arc<EngineRuntime>>,
}

#[cfg(feature = "zeromq")]
impl PyzmqSession {
    pub fn new(config: Arc<ConnectionConfig>) -> Self {
        Self {
            config,
            runtime: None,
        }
    }

    fn runtime(&mut self) -> SocketResult<Arc<EngineRuntime>> {
        if let Some(runtime) = &self.runtime {
            return Ok(Arc::clone(runtime));
        }
        let runtime = Arc::new(EngineRuntime::start()?);
        debug!(adapter = PyzmqAdapter::NAME, "started zeromq runtime");
        self.runtime = Some(Arc::clone(&runtime));
        Ok(runtime)
    }
}

#[cfg(feature = "zeromq")]
impl SessionAdapter for PyzmqSession {
    fn name(&self) -> &'static str {
        PyzmqAdapter::NAME
    }

    fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    fn make_socket(&mut self, pattern: SocketPattern, endpoint: &Endpoint) -> SocketResult<BoundSocket> {
        let runtime = self.runtime()?;
        let address = endpoint.socket_address();

        let mut inner = match pattern {
            SocketPattern::Router => Inner::Router(RouterSocket::new()),
            SocketPattern::Pub => Inner::Pub(PubSocket::new()),
            SocketPattern::Rep => Inner::Rep(RepSocket::new()),
        };
        let bound = runtime.block_on(inner.bind(&address)).map_err(|e| {
            SocketError::BindFailed {
                address: address.clone(),
                message: e.to_string(),
            }
        })?;

        let port = match &bound {
            zeromq::Endpoint::Tcp(_, port) => *port,
            _ => endpoint.port(),
        };
        let last_endpoint = bound.to_string();

        Ok((
            Box::new(PyzmqSocket {
                inner,
                pattern,
                last_endpoint,
                runtime,
            }),
            port,
        ))
    }
}

#[cfg(feature = "zeromq")]
enum Inner {
    Router(RouterSocket),
    Pub(PubSocket),
    Rep(RepSocket),
}

#[cfg(feature = "zeromq")]
impl Inner {
    async fn bind(&mut self, address: &str) -> zeromq::ZmqResult<zeromq::Endpoint> {
        match self {
            Inner::Router(socket) => socket.bind(address).await,
            Inner::Pub(socket) => socket.bind(address).await,
            Inner::Rep(socket) => socket.bind(address).await,
        }
    }

    async fn send(&mut self, message: ZmqMessage) -> zeromq::ZmqResult<()> {
        match self {
            Inner::Router(socket) => socket.send(message).await,
            Inner::Pub(socket) => socket.send(message).await,
            Inner::Rep(socket) => socket.send(message).await,
        }
    }

    async fn recv(&mut self) -> Option<zeromq::ZmqResult<ZmqMessage>> {
        match self {
            Inner::Router(socket) => Some(socket.recv().await),
            Inner::Rep(socket) => Some(socket.recv().await),
            Inner::Pub(_) => None,
        }
    }
}

#[cfg(feature = "zeromq")]
struct PyzmqSocket {
    inner: Inner,
    pattern: SocketPattern,
    last_endpoint: String,
    // dropped after the socket; it drives the engine's background tasks
    runtime: Arc<EngineRuntime>,
}

#[cfg(feature = "zeromq")]
impl SessionSocket for PyzmqSocket {
    fn pattern(&self) -> SocketPattern {
        self.pattern
    }

    fn last_endpoint(&self) -> &str {
        &self.last_endpoint
    }

    fn send_multipart(&mut self, frames: &[&[u8]]) -> SocketResult<()> {
        ensure_frames(frames)?;
        let mut message = ZmqMessage::from(frames[0].to_vec());
        for frame in &frames[1..] {
            message.push_back(frame.to_vec().into());
        }
        self.runtime.block_on(self.inner.send(message))
            .map_err(|e| SocketError::SendFailed(e.to_string()))
    }

    fn recv_multipart(&mut self) -> SocketResult<Vec<Vec<u8>>> {
        ensure_can_receive(self.pattern)?;
        let message = self.runtime.block_on(self.inner.recv())
            .ok_or(SocketError::Unsupported {
                pattern: self.pattern,
                operation: "receive",
            })?
            .map_err(|e| SocketError::ReceiveFailed(e.to_string()))?;
        Ok(message
            .into_vec()
            .into_iter()
            .map(|frame| frame.to_vec())
            .collect())
    }
}
