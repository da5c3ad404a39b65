//! Curated re-exports for host applications.
//!
//! ```rust
//! use actormesh_client::prelude::*;
//! ```

pub use crate::addressable::{
    ActorError, ActorKey, Addressable, AddressableConstructor, AddressableReference, Deactivator,
    InterfaceId,
};
pub use crate::client::{ClientConfig, ClientError, MeshClient, MeshClientBuilder};
pub use crate::invocation::{ActorProxy, InvocationError};
pub use crate::node::ClientState;
pub use crate::wire::{InProcessMesh, MeshTransport};
