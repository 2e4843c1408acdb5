// Copyright 2025 IRuby Developers
// SPDX-License-Identifier: Apache-2.0

//! Built-in ZeroMQ backends
//!
//! | Identifier | Backend                               | Needs                   |
//! |------------|---------------------------------------|-------------------------|
//! | `rbczmq`   | `zmq` crate, libzmq linked at build   | `zmq` feature           |
//! | `cztop`    | CZMQ `zsock`, loaded at runtime       | libczmq 4 and libzmq    |
//! | `ffi-rzmq` | libzmq C API, loaded at runtime       | libzmq 4                |
//! | `pyzmq`    | `zeromq` crate, pure Rust             | `zeromq` feature        |
//!
//! The identifiers are the ones kernels have always accepted in
//! `IRUBY_SESSION_ADAPTER`.

mod cztop;
mod ffi_rzmq;
mod pyzmq;
mod rbczmq;

pub use cztop::{CztopAdapter, CztopSession};
pub use ffi_rzmq::{FfiRzmqAdapter, FfiRzmqSession};
pub use pyzmq::PyzmqAdapter;
#[cfg(feature = "zeromq")]
pub use pyzmq::PyzmqSession;
pub use rbczmq::RbczmqAdapter;
#[cfg(feature = "zmq")]
pub use rbczmq::RbczmqSession;
