// Copyright 2025 IRuby Developers
// SPDX-License-Identifier: Apache-2.0

//! Runtime-loaded libzmq and CZMQ
//!
//! The cztop and ffi-rzmq adapters do not link against anything at build time.
//! Their libraries are opened with `dlopen` when probed or first used, so a
//! missing library only makes the adapter unavailable.

use std::ffi::{CStr, CString};
use std::os::raw::{c_char, c_int, c_void};
use std::ptr::NonNull;
use std::sync::Arc;

use crate::error::{SocketError, SocketResult};
use crate::probe::DependencyError;
use crate::socket::{ensure_can_receive, ensure_frames, SessionSocket, SocketPattern};

pub(crate) const LIBZMQ_CANDIDATES: &[&str] = &[
    "libzmq.so.5",
    "libzmq.so",
    "libzmq.5.dylib",
    "libzmq.dylib",
];

pub(crate) const LIBCZMQ_CANDIDATES: &[&str] = &[
    "libczmq.so.4",
    "libczmq.so",
    "libczmq.4.dylib",
    "libczmq.dylib",
];

// zmq.h
const ZMQ_PUB: c_int = 1;
const ZMQ_REP: c_int = 4;
const ZMQ_ROUTER: c_int = 6;
const ZMQ_LINGER: c_int = 17;
const ZMQ_LAST_ENDPOINT: c_int = 32;
const ZMQ_SNDMORE: c_int = 2;

const LAST_ENDPOINT_CAPACITY: usize = 256;

fn socket_type(pattern: SocketPattern) -> c_int {
    match pattern {
        SocketPattern::Router => ZMQ_ROUTER,
        SocketPattern::Pub => ZMQ_PUB,
        SocketPattern::Rep => ZMQ_REP,
    }
}

/// A `dlopen` handle, closed on drop
pub(crate) struct NativeLibrary {
    handle: NonNull<c_void>,
    name: String,
}

// dl handles may be used and closed from any thread
unsafe impl Send for NativeLibrary {}
unsafe impl Sync for NativeLibrary {}

impl NativeLibrary {
    /// Open the first loadable file name among `candidates`
    pub(crate) fn open_any(library: &str, candidates: &[&str]) -> Result<Self, DependencyError> {
        let mut failures = Vec::with_capacity(candidates.len());

        for candidate in candidates {
            let file = CString::new(*candidate).map_err(|e| DependencyError::LibraryNotFound {
                library: library.to_string(),
                message: e.to_string(),
            })?;
            let handle = unsafe { libc::dlopen(file.as_ptr(), libc::RTLD_NOW | libc::RTLD_LOCAL) };
            match NonNull::new(handle) {
                Some(handle) => {
                    tracing::trace!(library, file = *candidate, "opened shared library");
                    return Ok(Self {
                        handle,
                        name: (*candidate).to_string(),
                    });
                }
                None => failures.push(dl_error().unwrap_or_else(|| format!("{}: not found", candidate))),
            }
        }

        Err(DependencyError::LibraryNotFound {
            library: library.to_string(),
            message: failures.join("; "),
        })
    }

    /// Look up `symbol` as a value of type `T`
    ///
    /// # Safety
    ///
    /// `T` must be a pointer-sized `extern "C"` function pointer matching the
    /// symbol's real signature.
    pub(crate) unsafe fn symbol<T: Copy>(&self, symbol: &str) -> Result<T, DependencyError> {
        debug_assert_eq!(std::mem::size_of::<T>(), std::mem::size_of::<*mut c_void>());

        let missing = || DependencyError::MissingSymbol {
            library: self.name.clone(),
            symbol: symbol.to_string(),
        };
        let cname = CString::new(symbol).map_err(|_| missing())?;
        let ptr = libc::dlsym(self.handle.as_ptr(), cname.as_ptr());
        if ptr.is_null() {
            return Err(missing());
        }
        Ok(std::mem::transmute_copy::<*mut c_void, T>(&ptr))
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for NativeLibrary {
    fn drop(&mut self) {
        unsafe {
            libc::dlclose(self.handle.as_ptr());
        }
    }
}

fn dl_error() -> Option<String> {
    let message = unsafe { libc::dlerror() };
    if message.is_null() {
        None
    } else {
        Some(unsafe { CStr::from_ptr(message) }.to_string_lossy().into_owned())
    }
}

/// Opaque `zmq_msg_t`
#[repr(C, align(8))]
struct ZmqMsg([u8; 64]);

impl ZmqMsg {
    fn zeroed() -> Self {
        ZmqMsg([0; 64])
    }
}

/// libzmq entry points used by the native adapters
pub(crate) struct LibZmq {
    ctx_new: unsafe extern "C" fn() -> *mut c_void,
    ctx_term: unsafe extern "C" fn(*mut c_void) -> c_int,
    socket: unsafe extern "C" fn(*mut c_void, c_int) -> *mut c_void,
    close: unsafe extern "C" fn(*mut c_void) -> c_int,
    bind: unsafe extern "C" fn(*mut c_void, *const c_char) -> c_int,
    setsockopt: unsafe extern "C" fn(*mut c_void, c_int, *const c_void, usize) -> c_int,
    getsockopt: unsafe extern "C" fn(*mut c_void, c_int, *mut c_void, *mut usize) -> c_int,
    send: unsafe extern "C" fn(*mut c_void, *const c_void, usize, c_int) -> c_int,
    msg_init: unsafe extern "C" fn(*mut ZmqMsg) -> c_int,
    msg_recv: unsafe extern "C" fn(*mut ZmqMsg, *mut c_void, c_int) -> c_int,
    msg_data: unsafe extern "C" fn(*mut ZmqMsg) -> *mut c_void,
    msg_size: unsafe extern "C" fn(*const ZmqMsg) -> usize,
    msg_more: unsafe extern "C" fn(*const ZmqMsg) -> c_int,
    msg_close: unsafe extern "C" fn(*mut ZmqMsg) -> c_int,
    errno: unsafe extern "C" fn() -> c_int,
    strerror: unsafe extern "C" fn(c_int) -> *const c_char,
    version: unsafe extern "C" fn(*mut c_int, *mut c_int, *mut c_int),
    library: NativeLibrary,
}

impl LibZmq {
    pub(crate) fn load() -> Result<Self, DependencyError> {
        let library = NativeLibrary::open_any("libzmq", LIBZMQ_CANDIDATES)?;
        unsafe {
            Ok(Self {
                ctx_new: library.symbol("zmq_ctx_new")?,
                ctx_term: library.symbol("zmq_ctx_term")?,
                socket: library.symbol("zmq_socket")?,
                close: library.symbol("zmq_close")?,
                bind: library.symbol("zmq_bind")?,
                setsockopt: library.symbol("zmq_setsockopt")?,
                getsockopt: library.symbol("zmq_getsockopt")?,
                send: library.symbol("zmq_send")?,
                msg_init: library.symbol("zmq_msg_init")?,
                msg_recv: library.symbol("zmq_msg_recv")?,
                msg_data: library.symbol("zmq_msg_data")?,
                msg_size: library.symbol("zmq_msg_size")?,
                msg_more: library.symbol("zmq_msg_more")?,
                msg_close: library.symbol("zmq_msg_close")?,
                errno: library.symbol("zmq_errno")?,
                strerror: library.symbol("zmq_strerror")?,
                version: library.symbol("zmq_version")?,
                library,
            })
        }
    }

    /// Load and insist on at least `min_major`
    pub(crate) fn load_with_version(min_major: i32) -> Result<Self, DependencyError> {
        let lib = Self::load()?;
        let (major, minor, patch) = lib.version();
        if major < min_major {
            return Err(DependencyError::VersionTooOld {
                library: lib.library.name().to_string(),
                found: format!("{}.{}.{}", major, minor, patch),
                required: format!("{}.0.0", min_major),
            });
        }
        Ok(lib)
    }

    pub(crate) fn version(&self) -> (i32, i32, i32) {
        let (mut major, mut minor, mut patch) = (0, 0, 0);
        unsafe { (self.version)(&mut major, &mut minor, &mut patch) };
        (major, minor, patch)
    }

    fn last_error(&self) -> (i32, String) {
        unsafe {
            let code = (self.errno)();
            let message = (self.strerror)(code);
            let message = if message.is_null() {
                format!("errno {}", code)
            } else {
                CStr::from_ptr(message).to_string_lossy().into_owned()
            };
            (code, message)
        }
    }

    fn native_error(&self) -> SocketError {
        let (code, message) = self.last_error();
        SocketError::Native { code, message }
    }

    unsafe fn set_linger(&self, socket: *mut c_void, millis: c_int) -> SocketResult<()> {
        let rc = (self.setsockopt)(
            socket,
            ZMQ_LINGER,
            &millis as *const c_int as *const c_void,
            std::mem::size_of::<c_int>(),
        );
        if rc != 0 {
            return Err(self.native_error());
        }
        Ok(())
    }

    unsafe fn last_endpoint(&self, socket: *mut c_void) -> SocketResult<String> {
        let mut buffer = [0u8; LAST_ENDPOINT_CAPACITY];
        let mut size = buffer.len();
        let rc = (self.getsockopt)(
            socket,
            ZMQ_LAST_ENDPOINT,
            buffer.as_mut_ptr() as *mut c_void,
            &mut size,
        );
        if rc != 0 {
            return Err(self.native_error());
        }
        let endpoint = &buffer[..size.min(buffer.len())];
        Ok(String::from_utf8_lossy(endpoint)
            .trim_end_matches('\0')
            .to_string())
    }

    unsafe fn send_frames(&self, socket: *mut c_void, frames: &[&[u8]]) -> SocketResult<()> {
        ensure_frames(frames)?;
        let last = frames.len() - 1;
        for (index, frame) in frames.iter().enumerate() {
            let flags = if index < last { ZMQ_SNDMORE } else { 0 };
            loop {
                let rc = (self.send)(socket, frame.as_ptr() as *const c_void, frame.len(), flags);
                if rc >= 0 {
                    break;
                }
                let (code, message) = self.last_error();
                if code != libc::EINTR {
                    return Err(SocketError::SendFailed(message));
                }
            }
        }
        Ok(())
    }

    unsafe fn recv_frames(&self, socket: *mut c_void) -> SocketResult<Vec<Vec<u8>>> {
        let mut frames = Vec::new();
        loop {
            let mut msg = ZmqMsg::zeroed();
            if (self.msg_init)(&mut msg) != 0 {
                return Err(self.native_error());
            }
            if (self.msg_recv)(&mut msg, socket, 0) < 0 {
                let (code, message) = self.last_error();
                (self.msg_close)(&mut msg);
                if code == libc::EINTR {
                    continue;
                }
                return Err(SocketError::ReceiveFailed(message));
            }

            let size = (self.msg_size)(&msg);
            let frame = if size == 0 {
                Vec::new()
            } else {
                let data = (self.msg_data)(&mut msg) as *const u8;
                std::slice::from_raw_parts(data, size).to_vec()
            };
            let more = (self.msg_more)(&msg) != 0;
            (self.msg_close)(&mut msg);

            frames.push(frame);
            if !more {
                return Ok(frames);
            }
        }
    }
}

/// A libzmq context, terminated once the last socket using it is gone
pub(crate) struct NativeContext {
    lib: Arc<LibZmq>,
    raw: NonNull<c_void>,
}

// zmq contexts are thread safe
unsafe impl Send for NativeContext {}
unsafe impl Sync for NativeContext {}

impl NativeContext {
    pub(crate) fn new(lib: Arc<LibZmq>) -> Result<Self, DependencyError> {
        let raw = unsafe { (lib.ctx_new)() };
        match NonNull::new(raw) {
            Some(raw) => Ok(Self { lib, raw }),
            None => Err(DependencyError::InitializationFailed {
                library: lib.library.name().to_string(),
                message: lib.last_error().1,
            }),
        }
    }

    pub(crate) fn lib(&self) -> &Arc<LibZmq> {
        &self.lib
    }
}

impl Drop for NativeContext {
    fn drop(&mut self) {
        unsafe {
            (self.lib.ctx_term)(self.raw.as_ptr());
        }
    }
}

/// Socket created straight through libzmq
pub(crate) struct NativeSocket {
    context: Arc<NativeContext>,
    raw: NonNull<c_void>,
    pattern: SocketPattern,
    last_endpoint: String,
}

// a zmq socket may move between threads, it is never shared
unsafe impl Send for NativeSocket {}

impl NativeSocket {
    /// Create a socket of `pattern` in `context` and bind it to `address`
    pub(crate) fn bind(
        context: &Arc<NativeContext>,
        pattern: SocketPattern,
        address: &str,
    ) -> SocketResult<Self> {
        let lib = context.lib();
        let raw = unsafe { (lib.socket)(context.raw.as_ptr(), socket_type(pattern)) };
        let raw = NonNull::new(raw).ok_or_else(|| lib.native_error())?;
        // Closed by Drop if anything below fails
        let mut socket = Self {
            context: Arc::clone(context),
            raw,
            pattern,
            last_endpoint: String::new(),
        };

        unsafe {
            lib.set_linger(raw.as_ptr(), 0)?;
            let c_address = CString::new(address)
                .map_err(|e| SocketError::InvalidEndpoint(e.to_string()))?;
            if (lib.bind)(raw.as_ptr(), c_address.as_ptr()) != 0 {
                return Err(SocketError::BindFailed {
                    address: address.to_string(),
                    message: lib.last_error().1,
                });
            }
            socket.last_endpoint = lib.last_endpoint(raw.as_ptr())?;
        }
        Ok(socket)
    }
}

impl SessionSocket for NativeSocket {
    fn pattern(&self) -> SocketPattern {
        self.pattern
    }

    fn last_endpoint(&self) -> &str {
        &self.last_endpoint
    }

    fn send_multipart(&mut self, frames: &[&[u8]]) -> SocketResult<()> {
        unsafe { self.context.lib().send_frames(self.raw.as_ptr(), frames) }
    }

    fn recv_multipart(&mut self) -> SocketResult<Vec<Vec<u8>>> {
        ensure_can_receive(self.pattern)?;
        unsafe { self.context.lib().recv_frames(self.raw.as_ptr()) }
    }
}

impl Drop for NativeSocket {
    fn drop(&mut self) {
        unsafe {
            (self.context.lib().close)(self.raw.as_ptr());
        }
    }
}

/// CZMQ entry points used by the cztop adapter
pub(crate) struct LibCzmq {
    zsock_new: unsafe extern "C" fn(c_int) -> *mut c_void,
    zsock_destroy: unsafe extern "C" fn(*mut *mut c_void),
    zsock_bind: unsafe extern "C" fn(*mut c_void, *const c_char, ...) -> c_int,
    zsock_resolve: unsafe extern "C" fn(*mut c_void) -> *mut c_void,
    zsys_version: unsafe extern "C" fn(*mut c_int, *mut c_int, *mut c_int),
    library: NativeLibrary,
}

impl LibCzmq {
    pub(crate) fn load() -> Result<Self, DependencyError> {
        let library = NativeLibrary::open_any("libczmq", LIBCZMQ_CANDIDATES)?;
        unsafe {
            Ok(Self {
                zsock_new: library.symbol("zsock_new")?,
                zsock_destroy: library.symbol("zsock_destroy")?,
                zsock_bind: library.symbol("zsock_bind")?,
                zsock_resolve: library.symbol("zsock_resolve")?,
                zsys_version: library.symbol("zsys_version")?,
                library,
            })
        }
    }

    pub(crate) fn load_with_version(min_major: i32) -> Result<Self, DependencyError> {
        let lib = Self::load()?;
        let (major, minor, patch) = lib.version();
        if major < min_major {
            return Err(DependencyError::VersionTooOld {
                library: lib.library.name().to_string(),
                found: format!("{}.{}.{}", major, minor, patch),
                required: format!("{}.0.0", min_major),
            });
        }
        Ok(lib)
    }

    pub(crate) fn version(&self) -> (i32, i32, i32) {
        let (mut major, mut minor, mut patch) = (0, 0, 0);
        unsafe { (self.zsys_version)(&mut major, &mut minor, &mut patch) };
        (major, minor, patch)
    }
}

/// Socket created through CZMQ's `zsock`
///
/// CZMQ owns the context. Frame I/O goes through libzmq on the resolved
/// handle.
pub(crate) struct CzmqSocket {
    czmq: Arc<LibCzmq>,
    zmq: Arc<LibZmq>,
    zsock: *mut c_void,
    raw: *mut c_void,
    pattern: SocketPattern,
    last_endpoint: String,
}

unsafe impl Send for CzmqSocket {}

impl CzmqSocket {
    pub(crate) fn bind(
        czmq: &Arc<LibCzmq>,
        zmq: &Arc<LibZmq>,
        pattern: SocketPattern,
        address: &str,
    ) -> SocketResult<Self> {
        let zsock = unsafe { (czmq.zsock_new)(socket_type(pattern)) };
        if zsock.is_null() {
            return Err(zmq.native_error());
        }
        let mut socket = Self {
            czmq: Arc::clone(czmq),
            zmq: Arc::clone(zmq),
            zsock,
            raw: unsafe { (czmq.zsock_resolve)(zsock) },
            pattern,
            last_endpoint: String::new(),
        };
        if socket.raw.is_null() {
            return Err(SocketError::BindFailed {
                address: address.to_string(),
                message: "zsock_resolve returned no handle".to_string(),
            });
        }

        unsafe {
            zmq.set_linger(socket.raw, 0)?;
            let c_address = CString::new(address)
                .map_err(|e| SocketError::InvalidEndpoint(e.to_string()))?;
            // zsock_bind takes a format string
            let rc = (czmq.zsock_bind)(zsock, b"%s\0".as_ptr() as *const c_char, c_address.as_ptr());
            if rc < 0 {
                return Err(SocketError::BindFailed {
                    address: address.to_string(),
                    message: zmq.last_error().1,
                });
            }
            socket.last_endpoint = zmq.last_endpoint(socket.raw)?;
        }
        Ok(socket)
    }
}

impl SessionSocket for CzmqSocket {
    fn pattern(&self) -> SocketPattern {
        self.pattern
    }

    fn last_endpoint(&self) -> &str {
        &self.last_endpoint
    }

    fn send_multipart(&mut self, frames: &[&[u8]]) -> SocketResult<()> {
        unsafe { self.zmq.send_frames(self.raw, frames) }
    }

    fn recv_multipart(&mut self) -> SocketResult<Vec<Vec<u8>>> {
        ensure_can_receive(self.pattern)?;
        unsafe { self.zmq.recv_frames(self.raw) }
    }
}

impl Drop for CzmqSocket {
    fn drop(&mut self) {
        unsafe { (self.czmq.zsock_destroy)(&mut self.zsock) };
    }
}
