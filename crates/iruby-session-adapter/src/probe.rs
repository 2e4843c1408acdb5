// Copyright 2025 IRuby Developers
// SPDX-License-Identifier: Apache-2.0

//! Capability probing
//!
//! Every adapter answers "can I run here?" by trying to bring its dependency
//! into scope. A failed load is reported as [`Availability::Unavailable`] with
//! the cause attached; it never escapes the probe as an error.

use std::fmt;

/// Why an adapter's dependency could not be loaded
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DependencyError {
    /// The adapter's cargo feature was not enabled at build time
    #[error("built without the `{feature}` feature")]
    NotCompiled { feature: &'static str },

    /// None of the candidate shared libraries could be opened
    #[error("could not load {library}: {message}")]
    LibraryNotFound { library: String, message: String },

    /// The library opened but lacks a required entry point
    #[error("{library} does not export `{symbol}`")]
    MissingSymbol { library: String, symbol: String },

    /// The library is older than the adapter supports
    #[error("{library} {found} is too old (need {required} or newer)")]
    VersionTooOld {
        library: String,
        found: String,
        required: String,
    },

    /// Runtime loading is not possible on this platform
    #[error("dynamic loading of {library} is not supported on this platform")]
    UnsupportedPlatform { library: String },

    /// The dependency loaded but could not be initialised
    #[error("{library} failed to initialise: {message}")]
    InitializationFailed { library: String, message: String },
}

/// Outcome of an adapter probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Availability {
    Available,
    Unavailable(DependencyError),
}

impl Availability {
    pub fn is_available(&self) -> bool {
        matches!(self, Availability::Available)
    }

    /// The load failure, if the adapter is unavailable
    pub fn reason(&self) -> Option<&DependencyError> {
        match self {
            Availability::Available => None,
            Availability::Unavailable(reason) => Some(reason),
        }
    }
}

impl From<Result<(), DependencyError>> for Availability {
    fn from(result: Result<(), DependencyError>) -> Self {
        match result {
            Ok(()) => Availability::Available,
            Err(reason) => Availability::Unavailable(reason),
        }
    }
}

impl fmt::Display for Availability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Availability::Available => f.write_str("available"),
            Availability::Unavailable(reason) => write!(f, "unavailable ({})", reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_ok_is_available() {
        let availability = Availability::from(Ok(()));
        assert!(availability.is_available());
        assert_eq!(availability.reason(), None);
    }

    #[test]
    fn test_from_err_keeps_reason() {
        let reason = DependencyError::NotCompiled { feature: "zmq" };
        let availability = Availability::from(Err(reason.clone()));
        assert!(!availability.is_available());
        assert_eq!(availability.reason(), Some(&reason));
    }

    #[test]
    fn test_display() {
        let availability = Availability::Unavailable(DependencyError::LibraryNotFound {
            library: "libczmq".to_string(),
            message: "libczmq.so.4: cannot open shared object file".to_string(),
        });
        assert_eq!(
            availability.to_string(),
            "unavailable (could not load libczmq: libczmq.so.4: cannot open shared object file)"
        );
        assert_eq!(Availability::Available.to_string(), "available");
    }
}
