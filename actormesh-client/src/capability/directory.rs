//! Interface-to-constructor mapping, frozen at startup.

// Layer 1: Standard library imports
use std::collections::{BTreeSet, HashMap};

// Layer 2: Third-party crate imports
use parking_lot::RwLock;

// Layer 3: Internal module imports
use super::error::CapabilityError;
use super::scanner::ScanResult;
use crate::addressable::{AddressableConstructor, InterfaceId};

struct Definitions {
    interfaces: BTreeSet<InterfaceId>,
    constructors: HashMap<InterfaceId, AddressableConstructor>,
}

/// Serves capability advertisement and on-demand constructor lookup.
///
/// Consumes one [`ScanResult`] via [`setup_definition`](Self::setup_definition)
/// and is immutable afterwards; a second setup fails without mutating
/// anything.
#[derive(Default)]
pub struct DefinitionDirectory {
    definitions: RwLock<Option<Definitions>>,
}

impl DefinitionDirectory {
    /// Create an uninitialized directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the scan result. Single-shot.
    pub fn setup_definition(&self, scan: ScanResult) -> Result<(), CapabilityError> {
        let mut guard = self.definitions.write();
        if guard.is_some() {
            return Err(CapabilityError::AlreadyInitialized);
        }
        *guard = Some(Definitions {
            interfaces: scan.interfaces,
            constructors: scan.constructors,
        });
        Ok(())
    }

    /// The interface set to advertise at join.
    pub fn generate_capabilities(&self) -> Result<BTreeSet<InterfaceId>, CapabilityError> {
        self.definitions
            .read()
            .as_ref()
            .map(|defs| defs.interfaces.clone())
            .ok_or(CapabilityError::NotInitialized)
    }

    /// Constructor for one interface, for on-demand activation.
    pub fn lookup(&self, interface: &InterfaceId) -> Result<AddressableConstructor, CapabilityError> {
        let guard = self.definitions.read();
        let defs = guard.as_ref().ok_or(CapabilityError::NotInitialized)?;
        defs.constructors
            .get(interface)
            .cloned()
            .ok_or_else(|| CapabilityError::UnknownInterface(interface.clone()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::addressable::{ActorError, Addressable};
    use crate::capability::CapabilityScanner;
    use async_trait::async_trait;
    use serde_json::Value;
    use std::sync::Arc;

    struct Noop;

    #[async_trait]
    impl Addressable for Noop {
        async fn on_invoke(&mut self, _m: &str, _a: Vec<Value>) -> Result<Value, ActorError> {
            Ok(Value::Null)
        }
    }

    fn scanned() -> ScanResult {
        let scanner = CapabilityScanner::new();
        scanner
            .register(InterfaceId::new("IGreeter"), Arc::new(|_| Ok(Box::new(Noop))))
            .unwrap();
        scanner.scan()
    }

    #[test]
    fn test_queries_before_setup_fail() {
        let directory = DefinitionDirectory::new();
        assert!(matches!(
            directory.generate_capabilities(),
            Err(CapabilityError::NotInitialized)
        ));
        assert!(matches!(
            directory.lookup(&InterfaceId::new("IGreeter")),
            Err(CapabilityError::NotInitialized)
        ));
    }

    #[test]
    fn test_setup_then_query() {
        let directory = DefinitionDirectory::new();
        directory.setup_definition(scanned()).unwrap();

        let capabilities = directory.generate_capabilities().unwrap();
        assert!(capabilities.contains(&InterfaceId::new("IGreeter")));
        assert!(directory.lookup(&InterfaceId::new("IGreeter")).is_ok());
    }

    #[test]
    fn test_setup_is_single_shot() {
        let directory = DefinitionDirectory::new();
        directory.setup_definition(scanned()).unwrap();

        let second = directory.setup_definition(ScanResult {
            interfaces: BTreeSet::new(),
            constructors: HashMap::new(),
        });
        assert!(matches!(second, Err(CapabilityError::AlreadyInitialized)));

        // State is untouched by the failed second setup.
        assert_eq!(directory.generate_capabilities().unwrap().len(), 1);
    }

    #[test]
    fn test_lookup_unknown_interface() {
        let directory = DefinitionDirectory::new();
        directory.setup_definition(scanned()).unwrap();
        assert!(matches!(
            directory.lookup(&InterfaceId::new("IMissing")),
            Err(CapabilityError::UnknownInterface(_))
        ));
    }
}
