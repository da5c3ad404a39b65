//! Registration-based capability discovery.
//!
//! Hosts register each actor interface they can serve together with its
//! constructor before the client starts; `scan()` then produces the
//! advertisement set and the constructor table in one pass.

// Layer 1: Standard library imports
use std::collections::{BTreeSet, HashMap};

// Layer 2: Third-party crate imports
use dashmap::DashMap;

// Layer 3: Internal module imports
use super::error::CapabilityError;
use crate::addressable::{AddressableConstructor, InterfaceId};

/// Output of one capability scan: what to advertise and how to construct.
pub struct ScanResult {
    /// Interfaces this host can serve.
    pub interfaces: BTreeSet<InterfaceId>,
    /// Constructor per interface.
    pub constructors: HashMap<InterfaceId, AddressableConstructor>,
}

/// Collects the actor interfaces the host process can serve.
///
/// # Example
/// ```rust
/// use std::sync::Arc;
/// use actormesh_client::addressable::{Addressable, ActorError, InterfaceId};
/// use actormesh_client::capability::CapabilityScanner;
/// use async_trait::async_trait;
/// use serde_json::Value;
///
/// struct Noop;
///
/// #[async_trait]
/// impl Addressable for Noop {
///     async fn on_invoke(&mut self, _m: &str, _a: Vec<Value>) -> Result<Value, ActorError> {
///         Ok(Value::Null)
///     }
/// }
///
/// let scanner = CapabilityScanner::new();
/// scanner
///     .register(InterfaceId::new("INoop"), Arc::new(|_| Ok(Box::new(Noop))))
///     .unwrap();
/// assert_eq!(scanner.scan().interfaces.len(), 1);
/// ```
#[derive(Default)]
pub struct CapabilityScanner {
    registered: DashMap<InterfaceId, AddressableConstructor>,
}

impl CapabilityScanner {
    /// Create an empty scanner.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register one interface and its constructor. Duplicate
    /// registrations for the same interface are rejected.
    pub fn register(
        &self,
        interface: InterfaceId,
        constructor: AddressableConstructor,
    ) -> Result<(), CapabilityError> {
        match self.registered.entry(interface.clone()) {
            dashmap::mapref::entry::Entry::Occupied(_) => {
                Err(CapabilityError::DuplicateInterface(interface))
            }
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(constructor);
                Ok(())
            }
        }
    }

    /// Enumerate everything registered so far.
    pub fn scan(&self) -> ScanResult {
        let mut interfaces = BTreeSet::new();
        let mut constructors = HashMap::new();
        for entry in self.registered.iter() {
            interfaces.insert(entry.key().clone());
            constructors.insert(entry.key().clone(), entry.value().clone());
        }
        ScanResult {
            interfaces,
            constructors,
        }
    }
}
