// Copyright 2025 IRuby Developers
// SPDX-License-Identifier: Apache-2.0

//! Error types for adapter resolution and socket construction

use crate::probe::DependencyError;
use crate::socket::SocketPattern;

/// Result type alias for socket operations
pub type SocketResult<T> = Result<T, SocketError>;

/// Result type alias for adapter resolution
pub type SessionAdapterResult<T> = Result<T, SessionAdapterError>;

/// Failure while creating, binding or using a socket
#[derive(Debug, thiserror::Error)]
pub enum SocketError {
    /// Protocol/host/port could not form a bindable endpoint
    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// The transport refused the bind (address in use, bad interface, ...)
    #[error("Bind failed on {address}: {message}")]
    BindFailed { address: String, message: String },

    #[error("Send failed: {0}")]
    SendFailed(String),

    #[error("Receive failed: {0}")]
    ReceiveFailed(String),

    /// Operation not offered by the socket pattern (e.g. receiving on PUB)
    #[error("{pattern} sockets do not support {operation}")]
    Unsupported {
        pattern: SocketPattern,
        operation: &'static str,
    },

    /// The adapter's library became unloadable after selection
    #[error("Adapter dependency unavailable: {0}")]
    Dependency(#[from] DependencyError),

    /// Error reported by a dynamically loaded libzmq
    #[error("libzmq error {code}: {message}")]
    Native { code: i32, message: String },

    #[cfg(feature = "zmq")]
    #[error("ZMQ error: {0}")]
    Zmq(#[from] zmq::Error),

    #[cfg(feature = "zeromq")]
    #[error("zeromq error: {0}")]
    Zeromq(#[from] zeromq::ZmqError),
}

/// Failure to pick or instantiate a session adapter
#[derive(Debug, thiserror::Error)]
pub enum SessionAdapterError {
    /// The override names a registered adapter whose probe failed
    #[error("Session adapter `{name}` from {source_var} is unavailable: {reason}")]
    AdapterUnavailable {
        name: String,
        source_var: &'static str,
        #[source]
        reason: DependencyError,
    },

    /// No override was given and every registered probe failed
    #[error("No session adapter is available (tried: {})", format_attempts(.attempts))]
    NoAdapterAvailable {
        attempts: Vec<(&'static str, DependencyError)>,
    },

    /// The override names an identifier the registry does not know
    #[error("Unknown session adapter `{name}` from {source_var} (known adapters: {})", .known.join(", "))]
    UnknownAdapter {
        name: String,
        source_var: &'static str,
        known: Vec<&'static str>,
    },

    /// A registry was built with the same identifier twice
    #[error("Session adapter `{0}` is registered more than once")]
    DuplicateAdapter(&'static str),

    /// The adapter class cannot produce an instance in this build
    #[error("Session adapter `{name}` cannot be instantiated: {reason}")]
    InstantiationFailed {
        name: &'static str,
        #[source]
        reason: DependencyError,
    },

    #[error(transparent)]
    Socket(#[from] SocketError),
}

fn format_attempts(attempts: &[(&'static str, DependencyError)]) -> String {
    if attempts.is_empty() {
        return "no adapters registered".to_string();
    }
    attempts
        .iter()
        .map(|(name, reason)| format!("{}: {}", name, reason))
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unavailable_message_names_adapter_and_variable() {
        let err = SessionAdapterError::AdapterUnavailable {
            name: "cztop".to_string(),
            source_var: "IRUBY_SESSION_ADAPTER",
            reason: DependencyError::NotCompiled { feature: "zmq" },
        };
        let message = err.to_string();
        assert!(message.contains("`cztop`"));
        assert!(message.contains("IRUBY_SESSION_ADAPTER"));
    }

    #[test]
    fn test_no_adapter_message_lists_attempts() {
        let err = SessionAdapterError::NoAdapterAvailable {
            attempts: vec![
                ("rbczmq", DependencyError::NotCompiled { feature: "zmq" }),
                ("pyzmq", DependencyError::NotCompiled { feature: "zeromq" }),
            ],
        };
        assert_eq!(
            err.to_string(),
            "No session adapter is available (tried: rbczmq: built without the `zmq` feature; \
             pyzmq: built without the `zeromq` feature)"
        );
    }

    #[test]
    fn test_unknown_adapter_lists_known() {
        let err = SessionAdapterError::UnknownAdapter {
            name: "czmq".to_string(),
            source_var: "IRUBY_SESSION_ADAPTER",
            known: vec!["rbczmq", "cztop"],
        };
        assert!(err.to_string().ends_with("(known adapters: rbczmq, cztop)"));
    }

    #[test]
    fn test_socket_error_is_transparent() {
        let err: SessionAdapterError = SocketError::InvalidEndpoint("udp://x:1".to_string()).into();
        assert_eq!(err.to_string(), "Invalid endpoint: udp://x:1");
    }
}
