// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
use thiserror::Error;

// Layer 3: Internal module imports
use crate::lease::LeaseError;
use crate::serializer::SerializationError;

/// Failure of one invocation, as seen by the caller.
///
/// Exactly one of these (or a successful result) completes every
/// outbound call. Errors raised at the remote actor arrive as
/// [`Remote`](Self::Remote) with the original kind tag preserved.
#[derive(Error, Debug)]
pub enum InvocationError {
    /// The caller's deadline expired before a response arrived. A
    /// response arriving later is dropped as stray.
    #[error("invocation deadline expired")]
    Timeout,

    /// The remote actor (or its runtime) failed the invocation.
    #[error("remote invocation failed: [{kind}] {message}")]
    Remote {
        /// Stable tag from the remote side.
        kind: String,
        /// Human-readable description.
        message: String,
    },

    /// The target activation could not be constructed.
    #[error("activation failed: {0}")]
    ActivationFailed(String),

    /// The target activation is deactivating or gone.
    #[error("activation is gone")]
    ActivationGone,

    /// Arguments or result could not cross the serializer boundary.
    #[error(transparent)]
    Serialization(#[from] SerializationError),

    /// Routing lease could not be obtained for the target.
    #[error(transparent)]
    Lease(#[from] LeaseError),

    /// The stream went down and the call could not complete.
    #[error("stream disconnected before completion")]
    Disconnected,
}

impl InvocationError {
    /// The stable tag used when this error is sent over the wire as an
    /// invocation failure.
    pub fn wire_kind(&self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::Remote { .. } => "remote",
            Self::ActivationFailed(_) => "activation_failed",
            Self::ActivationGone => "activation_gone",
            Self::Serialization(_) => "serialization",
            Self::Lease(_) => "lease",
            Self::Disconnected => "disconnected",
        }
    }
}
