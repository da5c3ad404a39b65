//! Boundary contract with the mesh: frame types, the transport trait,
//! and an in-process mesh used for tests and demos.

pub mod error;
pub mod frames;
pub mod memory;
pub mod traits;

pub use error::TransportError;
pub use frames::{
    AddressableLeaseRequest, AddressableLeaseResponse, JoinClusterRequest, JoinClusterResponse,
    LeaveClusterRequest, LeaveClusterResponse, MessageContent, MessageFrame, NodeLeaseTerms,
    RenewNodeLeaseRequest, RenewNodeLeaseResponse,
};
pub use memory::InProcessMesh;
pub use traits::{MeshTransport, MessageStream};
