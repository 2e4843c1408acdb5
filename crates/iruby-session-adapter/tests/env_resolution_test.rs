// Copyright 2025 IRuby Developers
// SPDX-License-Identifier: Apache-2.0

//! Resolution against the built-in registry driven by `IRUBY_SESSION_ADAPTER`

use std::env;
use std::sync::Mutex;

use iruby_config::{IrubyConfig, SESSION_ADAPTER_ENV};
use iruby_session_adapter::{
    open_session, select_adapter_class_from_env, AdapterClass, AdapterRegistry,
    SessionAdapter, SessionAdapterError,
};

static ENV_LOCK: Mutex<()> = Mutex::new(());

/// Run `f` with the override set to `value` (or removed), restoring it afterwards
fn with_override<T>(value: Option<&str>, f: impl FnOnce() -> T) -> T {
    let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let previous = env::var(SESSION_ADAPTER_ENV).ok();
    match value {
        Some(value) => env::set_var(SESSION_ADAPTER_ENV, value),
        None => env::remove_var(SESSION_ADAPTER_ENV),
    }

    let result = f();

    match previous {
        Some(previous) => env::set_var(SESSION_ADAPTER_ENV, previous),
        None => env::remove_var(SESSION_ADAPTER_ENV),
    }
    result
}

#[test]
fn test_unknown_override_is_rejected() {
    let err = with_override(Some("zmqq"), || {
        select_adapter_class_from_env(AdapterRegistry::builtin()).unwrap_err()
    });

    match err {
        SessionAdapterError::UnknownAdapter { name, known, .. } => {
            assert_eq!(name, "zmqq");
            assert_eq!(known, vec!["rbczmq", "cztop", "ffi-rzmq", "pyzmq"]);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_fallback_matches_report() {
    let selected = with_override(None, || {
        select_adapter_class_from_env(AdapterRegistry::builtin())
    });

    let first_available = AdapterRegistry::builtin()
        .report()
        .into_iter()
        .find(|status| status.availability.is_available());

    match (selected, first_available) {
        (Ok(class), Some(status)) => assert_eq!(class.name(), status.name),
        (Err(SessionAdapterError::NoAdapterAvailable { attempts }), None) => {
            assert_eq!(attempts.len(), 4)
        }
        (selected, expected) => panic!("resolved {:?}, report says {:?}", selected, expected),
    }
}

#[test]
fn test_empty_override_counts_as_unset() {
    let with_empty = with_override(Some(""), || {
        select_adapter_class_from_env(AdapterRegistry::builtin()).map(|class| class.name())
    });
    let without = with_override(None, || {
        select_adapter_class_from_env(AdapterRegistry::builtin()).map(|class| class.name())
    });

    assert_eq!(with_empty.ok(), without.ok());
}

#[test]
fn test_open_session_treats_empty_adapter_as_unset() {
    let mut config = IrubyConfig::default();
    config.session.adapter = Some(String::new());

    let opened = open_session(&config).map(|adapter| adapter.name());
    let fallback = with_override(None, || {
        select_adapter_class_from_env(AdapterRegistry::builtin()).map(|class| class.name())
    });

    assert!(!matches!(opened, Err(SessionAdapterError::UnknownAdapter { .. })));
    if let Ok(name) = opened {
        assert_eq!(Some(name), fallback.ok());
    }
}

#[cfg(feature = "zeromq")]
#[test]
fn test_override_selects_pyzmq() {
    let selected = with_override(Some("pyzmq"), || {
        select_adapter_class_from_env(AdapterRegistry::builtin())
    })
    .unwrap();

    assert_eq!(selected.name(), "pyzmq");
}

#[cfg(not(feature = "zmq"))]
#[test]
fn test_override_of_uncompiled_backend_fails_without_fallback() {
    let err = with_override(Some("rbczmq"), || {
        select_adapter_class_from_env(AdapterRegistry::builtin()).unwrap_err()
    });

    assert!(matches!(
        err,
        SessionAdapterError::AdapterUnavailable { ref name, source_var: "IRUBY_SESSION_ADAPTER", .. }
            if name == "rbczmq"
    ));
}
