// Layer 1: Standard library imports
use std::fmt::{self, Display};

// Layer 2: Third-party crate imports
use serde::{Deserialize, Serialize};

// Layer 3: Internal module imports
// (none)

/// Stable name of one actor interface version.
///
/// Advertised to the mesh as a capability and used by the directory to
/// route invocations to a node that can host it. Two nodes advertising
/// the same `InterfaceId` are interchangeable hosts for that interface.
///
/// # Example
/// ```rust
/// use actormesh_client::addressable::InterfaceId;
///
/// let greeter = InterfaceId::new("IGreeter");
/// assert_eq!(greeter.as_str(), "IGreeter");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct InterfaceId(String);

impl InterfaceId {
    /// Create an interface id from its stable name.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// View the interface name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for InterfaceId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl Display for InterfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque identity of one virtual actor within an interface.
///
/// The mesh places one activation per (interface, key) pair somewhere in
/// the cluster; callers never learn or care where.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ActorKey {
    /// Singleton actors that need no identity beyond their interface.
    None,
    /// String-keyed identity.
    String(String),
    /// Integer-keyed identity.
    Int(i64),
}

impl ActorKey {
    /// String-keyed convenience constructor.
    pub fn string(key: impl Into<String>) -> Self {
        Self::String(key.into())
    }
}

impl From<&str> for ActorKey {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

impl From<i64> for ActorKey {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl Display for ActorKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "-"),
            Self::String(key) => write!(f, "{key}"),
            Self::Int(key) => write!(f, "{key}"),
        }
    }
}

/// Full address of a virtual actor: interface plus key.
///
/// # Example
/// ```rust
/// use actormesh_client::addressable::{ActorKey, AddressableReference, InterfaceId};
///
/// let reference = AddressableReference::new(InterfaceId::new("IGreeter"), ActorKey::from("a"));
/// assert_eq!(reference.to_string(), "IGreeter/a");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AddressableReference {
    /// Interface the target actor implements.
    pub interface: InterfaceId,
    /// Identity of the actor within that interface.
    pub key: ActorKey,
}

impl AddressableReference {
    /// Build a reference from interface and key.
    pub fn new(interface: InterfaceId, key: ActorKey) -> Self {
        Self { interface, key }
    }
}

impl Display for AddressableReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.interface, self.key)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_interface_id_display() {
        assert_eq!(InterfaceId::new("IGreeter").to_string(), "IGreeter");
    }

    #[test]
    fn test_actor_key_variants_display() {
        assert_eq!(ActorKey::None.to_string(), "-");
        assert_eq!(ActorKey::from("a").to_string(), "a");
        assert_eq!(ActorKey::from(7).to_string(), "7");
    }

    #[test]
    fn test_reference_equality_is_structural() {
        let a = AddressableReference::new("IGreeter".into(), "x".into());
        let b = AddressableReference::new("IGreeter".into(), "x".into());
        let c = AddressableReference::new("IGreeter".into(), "y".into());
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_reference_serde_round_trip() {
        let reference = AddressableReference::new("ICounter".into(), ActorKey::Int(42));
        let json = serde_json::to_string(&reference).unwrap();
        let back: AddressableReference = serde_json::from_str(&json).unwrap();
        assert_eq!(reference, back);
    }
}
