// Copyright 2025 IRuby Developers
// SPDX-License-Identifier: Apache-2.0

//! Adapter resolution
//!
//! With an explicit request the named adapter is used or resolution fails;
//! there is no silent fallback. Without one, the registry is probed in order
//! and the first available adapter wins. Nothing is cached: every call probes
//! again.

use std::env;
use std::sync::Arc;

use iruby_config::{IrubyConfig, SESSION_ADAPTER_ENV};
use tracing::{debug, info, warn};

use crate::adapter::{AdapterClass, SessionAdapter};
use crate::error::{SessionAdapterError, SessionAdapterResult};
use crate::probe::Availability;
use crate::registry::AdapterRegistry;

/// Pick the adapter class to use
///
/// # Arguments
///
/// * `registry` - Candidates in priority order
/// * `requested` - Adapter forced by configuration (`IRUBY_SESSION_ADAPTER`), if any
///
/// # Errors
///
/// - `UnknownAdapter` if `requested` is not registered
/// - `AdapterUnavailable` if `requested` is registered but its probe fails
/// - `NoAdapterAvailable` if nothing was requested and every probe fails
pub fn select_adapter_class(
    registry: &AdapterRegistry,
    requested: Option<&str>,
) -> SessionAdapterResult<Arc<dyn AdapterClass>> {
    match requested {
        Some(name) => select_requested(registry, name),
        None => select_first_available(registry),
    }
}

fn select_requested(
    registry: &AdapterRegistry,
    name: &str,
) -> SessionAdapterResult<Arc<dyn AdapterClass>> {
    let class = registry
        .get(name)
        .ok_or_else(|| SessionAdapterError::UnknownAdapter {
            name: name.to_string(),
            source_var: SESSION_ADAPTER_ENV,
            known: registry.names(),
        })?;

    match class.available() {
        Availability::Available => {
            info!(adapter = name, "using requested session adapter");
            Ok(Arc::clone(class))
        }
        Availability::Unavailable(reason) => {
            warn!(adapter = name, %reason, "requested session adapter is unavailable");
            Err(SessionAdapterError::AdapterUnavailable {
                name: name.to_string(),
                source_var: SESSION_ADAPTER_ENV,
                reason,
            })
        }
    }
}

fn select_first_available(
    registry: &AdapterRegistry,
) -> SessionAdapterResult<Arc<dyn AdapterClass>> {
    let mut attempts = Vec::new();

    for class in registry.iter() {
        match class.available() {
            Availability::Available => {
                info!(adapter = class.name(), "selected session adapter");
                return Ok(Arc::clone(class));
            }
            Availability::Unavailable(reason) => {
                debug!(adapter = class.name(), %reason, "session adapter unavailable");
                attempts.push((class.name(), reason));
            }
        }
    }

    Err(SessionAdapterError::NoAdapterAvailable { attempts })
}

/// [`select_adapter_class`] with the request read from `IRUBY_SESSION_ADAPTER`
///
/// An empty value counts as unset.
pub fn select_adapter_class_from_env(
    registry: &AdapterRegistry,
) -> SessionAdapterResult<Arc<dyn AdapterClass>> {
    let requested = env::var(SESSION_ADAPTER_ENV)
        .ok()
        .filter(|value| !value.is_empty());
    select_adapter_class(registry, requested.as_deref())
}

/// Resolve against the built-in registry and instantiate for this session
///
/// Uses `config.session.adapter` as the request and hands the adapter a shared
/// copy of `config.connection`.
pub fn open_session(config: &IrubyConfig) -> SessionAdapterResult<Box<dyn SessionAdapter>> {
    let requested = config
        .session
        .adapter
        .as_deref()
        .filter(|name| !name.is_empty());
    let class = select_adapter_class(AdapterRegistry::builtin(), requested)?;
    class.instantiate(Arc::new(config.connection.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{registry_of, MockAdapterClass};

    #[test]
    fn test_first_available_in_order() {
        let a = MockAdapterClass::new("a", false);
        let b = MockAdapterClass::new("b", true);
        let c = MockAdapterClass::new("c", true);
        let registry = registry_of(&[&a, &b, &c]);

        let selected = select_adapter_class(&registry, None).unwrap();

        assert_eq!(selected.name(), "b");
        // short-circuit: c is never probed
        assert_eq!(a.probe_count(), 1);
        assert_eq!(b.probe_count(), 1);
        assert_eq!(c.probe_count(), 0);
    }

    #[test]
    fn test_requested_unavailable_fails_naming_it() {
        let a = MockAdapterClass::new("a", false);
        let b = MockAdapterClass::new("b", true);
        let registry = registry_of(&[&a, &b]);

        let err = select_adapter_class(&registry, Some("a")).unwrap_err();

        match err {
            SessionAdapterError::AdapterUnavailable { name, source_var, .. } => {
                assert_eq!(name, "a");
                assert_eq!(source_var, "IRUBY_SESSION_ADAPTER");
            }
            other => panic!("unexpected error: {other}"),
        }
        // no fallback once a request was made
        assert_eq!(b.probe_count(), 0);
    }

    #[test]
    fn test_requested_available() {
        let a = MockAdapterClass::new("a", true);
        let registry = registry_of(&[&a]);

        let selected = select_adapter_class(&registry, Some("a")).unwrap();
        assert_eq!(selected.name(), "a");
    }

    #[test]
    fn test_request_overrides_priority() {
        let a = MockAdapterClass::new("a", true);
        let b = MockAdapterClass::new("b", true);
        let registry = registry_of(&[&a, &b]);

        let selected = select_adapter_class(&registry, Some("b")).unwrap();

        assert_eq!(selected.name(), "b");
        assert_eq!(a.probe_count(), 0);
    }

    #[test]
    fn test_nothing_available() {
        let registry = registry_of(&[
            &MockAdapterClass::new("a", false),
            &MockAdapterClass::new("b", false),
        ]);

        let err = select_adapter_class(&registry, None).unwrap_err();

        match err {
            SessionAdapterError::NoAdapterAvailable { attempts } => {
                let names: Vec<_> = attempts.iter().map(|(name, _)| *name).collect();
                assert_eq!(names, vec!["a", "b"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_unknown_request() {
        let a = MockAdapterClass::new("a", true);
        let registry = registry_of(&[&a]);

        let err = select_adapter_class(&registry, Some("zz")).unwrap_err();

        assert!(matches!(
            err,
            SessionAdapterError::UnknownAdapter { ref name, ref known, .. }
                if name == "zz" && known == &vec!["a"]
        ));
        assert_eq!(a.probe_count(), 0);
    }

    #[test]
    fn test_resolution_is_deterministic() {
        let registry = registry_of(&[
            &MockAdapterClass::new("a", false),
            &MockAdapterClass::new("b", true),
            &MockAdapterClass::new("c", true),
        ]);

        let first = select_adapter_class(&registry, None).unwrap();
        let second = select_adapter_class(&registry, None).unwrap();

        assert_eq!(first.name(), second.name());
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_empty_registry() {
        let registry = registry_of(&[]);
        assert!(matches!(
            select_adapter_class(&registry, None),
            Err(SessionAdapterError::NoAdapterAvailable { ref attempts }) if attempts.is_empty()
        ));
    }
}
