// Copyright 2025 IRuby Developers
// SPDX-License-Identifier: Apache-2.0

//! Ordered adapter registry
//!
//! Order is priority: when no adapter is requested explicitly, the first
//! available entry wins. A registry never changes after construction.

use std::collections::HashSet;
use std::sync::{Arc, OnceLock};

use crate::adapter::AdapterClass;
use crate::adapters::{CztopAdapter, FfiRzmqAdapter, PyzmqAdapter, RbczmqAdapter};
use crate::error::{SessionAdapterError, SessionAdapterResult};
use crate::probe::Availability;

/// Probe outcome for one registered adapter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdapterStatus {
    pub name: &'static str,
    pub availability: Availability,
}

/// Immutable, ordered identifier → adapter class mapping
#[derive(Debug)]
pub struct AdapterRegistry {
    entries: Vec<Arc<dyn AdapterClass>>,
}

impl AdapterRegistry {
    /// Build a registry from classes in priority order
    ///
    /// # Errors
    ///
    /// Returns `SessionAdapterError::DuplicateAdapter` if two classes share a name.
    pub fn new<I>(classes: I) -> SessionAdapterResult<Self>
    where
        I: IntoIterator<Item = Arc<dyn AdapterClass>>,
    {
        let entries: Vec<Arc<dyn AdapterClass>> = classes.into_iter().collect();
        let mut seen = HashSet::new();
        for class in &entries {
            if !seen.insert(class.name()) {
                return Err(SessionAdapterError::DuplicateAdapter(class.name()));
            }
        }
        Ok(Self { entries })
    }

    /// The four built-in adapters: rbczmq, cztop, ffi-rzmq, pyzmq
    pub fn builtin() -> &'static AdapterRegistry {
        static BUILTIN: OnceLock<AdapterRegistry> = OnceLock::new();
        BUILTIN.get_or_init(|| AdapterRegistry {
            entries: vec![
                Arc::new(RbczmqAdapter),
                Arc::new(CztopAdapter),
                Arc::new(FfiRzmqAdapter),
                Arc::new(PyzmqAdapter),
            ],
        })
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn AdapterClass>> {
        self.entries.iter().find(|class| class.name() == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Identifiers in priority order
    pub fn names(&self) -> Vec<&'static str> {
        self.entries.iter().map(|class| class.name()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn AdapterClass>> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Probe every entry, without stopping at the first available one
    pub fn report(&self) -> Vec<AdapterStatus> {
        self.entries
            .iter()
            .map(|class| AdapterStatus {
                name: class.name(),
                availability: class.available(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{registry_of, MockAdapterClass};

    #[test]
    fn test_builtin_order() {
        assert_eq!(
            AdapterRegistry::builtin().names(),
            vec!["rbczmq", "cztop", "ffi-rzmq", "pyzmq"]
        );
    }

    #[test]
    fn test_builtin_is_shared() {
        assert!(std::ptr::eq(AdapterRegistry::builtin(), AdapterRegistry::builtin()));
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let a = MockAdapterClass::new("a", true);
        let result = AdapterRegistry::new([
            a.clone() as Arc<dyn AdapterClass>,
            a as Arc<dyn AdapterClass>,
        ]);
        assert!(matches!(result, Err(SessionAdapterError::DuplicateAdapter("a"))));
    }

    #[test]
    fn test_lookup() {
        let registry = registry_of(&[
            &MockAdapterClass::new("a", false),
            &MockAdapterClass::new("b", true),
        ]);
        assert_eq!(registry.len(), 2);
        assert!(registry.contains("b"));
        assert!(registry.get("c").is_none());
    }

    #[test]
    fn test_report_probes_everything() {
        let a = MockAdapterClass::new("a", true);
        let b = MockAdapterClass::new("b", false);
        let registry = registry_of(&[&a, &b]);

        let report = registry.report();

        assert_eq!(report.len(), 2);
        assert!(report[0].availability.is_available());
        assert!(!report[1].availability.is_available());
        assert_eq!(a.probe_count(), 1);
        assert_eq!(b.probe_count(), 1);
    }

    #[test]
    fn test_builtin_probes_never_fail_loudly() {
        for status in AdapterRegistry::builtin().report() {
            if let Availability::Unavailable(reason) = &status.availability {
                assert!(!reason.to_string().is_empty(), "{} gave no reason", status.name);
            }
        }
    }
}
