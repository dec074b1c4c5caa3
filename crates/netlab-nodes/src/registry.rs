//! Kind name to driver lookup.
//!
//! Drivers register a constructor under one or more kind names. Callers ask
//! the registry for a fresh, uninitialized driver by kind.

use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

use netlab_runtime::RuntimeGateway;
use parking_lot::RwLock;
use tracing::debug;

use crate::driver::NodeDriver;
use crate::error::{NodeError, Result};
use crate::kinds;

/// Builds an uninitialized driver bound to a runtime.
pub type DriverConstructor = fn(Arc<dyn RuntimeGateway>) -> Box<dyn NodeDriver>;

static GLOBAL: LazyLock<DriverRegistry> = LazyLock::new(DriverRegistry::with_builtin_kinds);

/// The process-wide registry, preloaded with the built-in kinds.
#[must_use]
pub fn global() -> &'static DriverRegistry {
    &GLOBAL
}

/// Maps kind names to driver constructors.
#[derive(Default)]
pub struct DriverRegistry {
    constructors: RwLock<HashMap<String, DriverConstructor>>,
}

impl DriverRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with every built-in kind registered.
    #[must_use]
    pub fn with_builtin_kinds() -> Self {
        let registry = Self::new();
        kinds::register_builtin(&registry);
        registry
    }

    /// Register `constructor` under each name in `kinds`.
    ///
    /// A later registration for the same name replaces the earlier one.
    pub fn register(&self, kinds: &[&str], constructor: DriverConstructor) {
        let mut constructors = self.constructors.write();
        for kind in kinds {
            debug!(kind = %kind, "Registering node kind");
            constructors.insert((*kind).to_string(), constructor);
        }
    }

    /// Build a new driver for `kind`.
    ///
    /// # Errors
    ///
    /// Returns `NodeError::UnknownKind` if nothing is registered under `kind`.
    pub fn new_driver(
        &self,
        kind: &str,
        runtime: Arc<dyn RuntimeGateway>,
    ) -> Result<Box<dyn NodeDriver>> {
        let constructor = self
            .constructors
            .read()
            .get(kind)
            .copied()
            .ok_or_else(|| NodeError::UnknownKind(kind.to_string()))?;
        Ok(constructor(runtime))
    }

    /// Whether anything is registered under `kind`.
    #[must_use]
    pub fn contains(&self, kind: &str) -> bool {
        self.constructors.read().contains_key(kind)
    }

    /// All registered kind names, sorted.
    #[must_use]
    pub fn kinds(&self) -> Vec<String> {
        let mut kinds: Vec<String> = self.constructors.read().keys().cloned().collect();
        kinds.sort();
        kinds
    }
}

impl std::fmt::Debug for DriverRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DriverRegistry")
            .field("kinds", &self.kinds())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::NodeState;
    use netlab_runtime::MockRuntime;

    fn runtime() -> Arc<dyn RuntimeGateway> {
        Arc::new(MockRuntime::new())
    }

    #[test]
    fn builtin_kinds_and_aliases() {
        let registry = DriverRegistry::with_builtin_kinds();
        assert_eq!(
            registry.kinds(),
            vec!["cisco_xrd", "nokia_srlinux", "srl", "xrd"]
        );
    }

    #[test]
    fn alias_resolves_to_same_driver() {
        let registry = DriverRegistry::with_builtin_kinds();
        let a = registry.new_driver("cisco_xrd", runtime()).unwrap();
        let b = registry.new_driver("xrd", runtime()).unwrap();
        assert_eq!(a.kind(), "xrd");
        assert_eq!(b.kind(), "xrd");
        assert_eq!(a.state(), NodeState::Uninitialized);
    }

    #[test]
    fn unknown_kind_is_rejected() {
        let registry = DriverRegistry::with_builtin_kinds();
        let Err(err) = registry.new_driver("ceos", runtime()) else {
            panic!("ceos is not a built-in kind");
        };
        assert!(matches!(err, NodeError::UnknownKind(ref k) if k == "ceos"));
        assert!(!registry.contains("ceos"));
    }

    #[test]
    fn empty_registry_has_no_kinds() {
        let registry = DriverRegistry::new();
        assert!(registry.kinds().is_empty());
        assert!(registry.new_driver("xrd", runtime()).is_err());
    }

    #[test]
    fn global_registry_is_preloaded() {
        assert!(global().contains("srl"));
        assert!(global().contains("nokia_srlinux"));
    }
}
