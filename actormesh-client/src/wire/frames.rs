//! Frame types exchanged with the mesh.
//!
//! Control frames (join, renew, leave, addressable lease) travel as
//! request/response pairs; invocation traffic travels as correlated
//! [`MessageFrame`]s over the bidirectional stream. Every invocation
//! response echoes the `message_id` of its request; the client tolerates
//! arbitrary reordering between distinct ids.

// Layer 1: Standard library imports
use std::collections::BTreeSet;

// Layer 2: Third-party crate imports
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// Layer 3: Internal module imports
use crate::addressable::{AddressableLease, AddressableReference, InterfaceId};
use crate::util::{MessageId, NodeId};

/// Request to join the cluster, advertising hostable interfaces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinClusterRequest {
    /// Logical partition this node belongs to.
    pub namespace: String,
    /// Interfaces this node is willing to host.
    pub capabilities: BTreeSet<InterfaceId>,
}

/// Identity and lease terms granted at join.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeLeaseTerms {
    /// Mesh-assigned node identity.
    pub node_id: NodeId,
    /// Hard membership bound without renewal.
    pub expires_at: DateTime<Utc>,
    /// Renewal hint.
    pub renew_at: DateTime<Utc>,
}

/// Outcome of a join attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum JoinClusterResponse {
    /// Membership granted.
    Granted(NodeLeaseTerms),
    /// Membership refused; the client may retry.
    Rejected {
        /// Directory-provided refusal reason.
        reason: String,
    },
}

/// Request to extend the node lease.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenewNodeLeaseRequest {
    /// The renewing node.
    pub node_id: NodeId,
}

/// Outcome of a node lease renewal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RenewNodeLeaseResponse {
    /// Lease extended.
    Renewed {
        /// New hard bound.
        expires_at: DateTime<Utc>,
        /// New renewal hint.
        renew_at: DateTime<Utc>,
    },
    /// The lease is gone and cannot be recovered.
    Lost {
        /// Directory-provided reason.
        reason: String,
    },
}

/// Best-effort departure notice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaveClusterRequest {
    /// The departing node.
    pub node_id: NodeId,
}

/// Acknowledgement of departure. Leaving is idempotent; leaving twice is
/// acknowledged both times.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaveClusterResponse;

/// Request for the right to route to (or host) one actor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressableLeaseRequest {
    /// The requesting node.
    pub node_id: NodeId,
    /// The actor being addressed.
    pub reference: AddressableReference,
}

/// Outcome of an addressable lease request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AddressableLeaseResponse {
    /// Lease granted; `lease.node_id` names the hosting node.
    Granted(AddressableLease),
    /// No node can host this reference right now.
    Refused {
        /// Directory-provided reason.
        reason: String,
    },
}

/// One frame on the bidirectional message stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageFrame {
    /// Correlation id; responses echo the id of their request.
    pub message_id: MessageId,
    /// What the frame carries.
    pub content: MessageContent,
}

/// Payload of a [`MessageFrame`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum MessageContent {
    /// An invocation routed toward the actor's hosting node.
    InvocationRequest {
        /// The target actor.
        target: AddressableReference,
        /// Method name on the target interface.
        method: String,
        /// Serialized argument list.
        args: Bytes,
        /// Instant past which the caller no longer wants the answer.
        deadline: DateTime<Utc>,
    },
    /// Successful result for a prior request.
    InvocationResponse {
        /// Serialized result value.
        payload: Bytes,
    },
    /// Failure result for a prior request; `kind` is the stable tag the
    /// caller can branch on.
    InvocationFailure {
        /// Stable machine-readable tag.
        kind: String,
        /// Human-readable description.
        message: String,
    },
}
