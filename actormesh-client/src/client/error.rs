// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
use thiserror::Error;

// Layer 3: Internal module imports
use crate::capability::CapabilityError;
use crate::lease::LeaseError;
use crate::wire::TransportError;

/// Client lifecycle errors.
#[derive(Error, Debug)]
pub enum ClientError {
    /// `start()` was called on a client that is not idle. One instance
    /// runs one lifecycle; a stopped client is not restartable.
    #[error("client already started")]
    AlreadyStarted,

    /// The operation needs a running client.
    #[error("client is not running")]
    NotRunning,

    /// Startup was cancelled by a concurrent state change while the
    /// join retry loop was waiting.
    #[error("start cancelled")]
    StartCancelled,

    /// Every join attempt was refused or failed.
    #[error("cluster join failed after {attempts} attempts")]
    ClusterJoinFailed {
        /// How many attempts were made.
        attempts: u32,
    },

    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Capability registration or directory setup failed.
    #[error(transparent)]
    Capability(#[from] CapabilityError),

    /// Lease operation failed during startup.
    #[error(transparent)]
    Lease(#[from] LeaseError),

    /// Transport failure during startup or teardown.
    #[error(transparent)]
    Transport(#[from] TransportError),
}
