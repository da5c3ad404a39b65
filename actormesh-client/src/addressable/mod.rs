//! Virtual-actor identity: interface ids, keys, references, and leases,
//! plus the trait host actors implement.

pub mod actor;
pub mod lease;
pub mod reference;

pub use actor::{ActorError, Addressable, AddressableConstructor, Deactivator};
pub use lease::AddressableLease;
pub use reference::{ActorKey, AddressableReference, InterfaceId};
