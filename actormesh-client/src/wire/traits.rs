// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
use async_trait::async_trait;
use tokio::sync::mpsc;

// Layer 3: Internal module imports
use super::error::TransportError;
use super::frames::{
    AddressableLeaseRequest, AddressableLeaseResponse, JoinClusterRequest, JoinClusterResponse,
    LeaveClusterRequest, LeaveClusterResponse, MessageFrame, RenewNodeLeaseRequest,
    RenewNodeLeaseResponse,
};
use crate::util::NodeId;

/// Both halves of the bidirectional message stream.
///
/// Dropping `outbound` closes the client's half; the transport signals
/// its own disconnect by closing `inbound`.
pub struct MessageStream {
    /// Frames from this node toward the mesh.
    pub outbound: mpsc::Sender<MessageFrame>,
    /// Frames from the mesh toward this node.
    pub inbound: mpsc::Receiver<MessageFrame>,
}

/// The external transport to the mesh directory.
///
/// Control-plane calls are unary request/response; invocation traffic
/// flows over the stream opened by [`open_stream`](Self::open_stream).
/// Implementations are expected to be cheaply cloneable behind `Arc`.
#[async_trait]
pub trait MeshTransport: Send + Sync + 'static {
    /// Request cluster membership.
    async fn join_cluster(
        &self,
        request: JoinClusterRequest,
    ) -> Result<JoinClusterResponse, TransportError>;

    /// Extend the node lease.
    async fn renew_node_lease(
        &self,
        request: RenewNodeLeaseRequest,
    ) -> Result<RenewNodeLeaseResponse, TransportError>;

    /// Announce departure. Idempotent on the mesh side.
    async fn leave_cluster(
        &self,
        request: LeaveClusterRequest,
    ) -> Result<LeaveClusterResponse, TransportError>;

    /// Acquire or refresh the right to route to one actor.
    async fn lease_addressable(
        &self,
        request: AddressableLeaseRequest,
    ) -> Result<AddressableLeaseResponse, TransportError>;

    /// Open the bidirectional message stream for a joined node. May be
    /// called again after a disconnect; the previous stream is dead.
    async fn open_stream(&self, node_id: NodeId) -> Result<MessageStream, TransportError>;
}
