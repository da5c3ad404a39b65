// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
use thiserror::Error;

// Layer 3: Internal module imports
use crate::addressable::AddressableReference;
use crate::wire::TransportError;

/// Errors from lease acquisition and maintenance.
#[derive(Error, Debug, Clone)]
pub enum LeaseError {
    /// The directory refused cluster membership.
    #[error("cluster join rejected: {reason}")]
    JoinRejected {
        /// Directory-provided reason.
        reason: String,
    },

    /// The node lease is irrecoverably gone. This is the lifecycle-fatal
    /// signal: the orchestrator transitions to stopping and invokes the
    /// host's lease-failure handler.
    #[error("node lease renewal failed: {reason}")]
    NodeLeaseRenewalFailed {
        /// What ended the lease.
        reason: String,
    },

    /// The directory refused a routing lease for an actor.
    #[error("addressable lease refused for {reference}: {reason}")]
    AddressableLeaseRefused {
        /// The actor that could not be placed.
        reference: AddressableReference,
        /// Directory-provided reason.
        reason: String,
    },

    /// A lease operation was attempted before joining.
    #[error("not joined to the mesh")]
    NotJoined,

    /// Connectivity failure underneath the lease operation.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl LeaseError {
    /// Whether this error must stop the client rather than be retried.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::NodeLeaseRenewalFailed { .. })
    }
}
