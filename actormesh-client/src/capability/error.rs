// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
use thiserror::Error;

// Layer 3: Internal module imports
use crate::addressable::InterfaceId;

/// Errors from capability registration and lookup.
#[derive(Error, Debug)]
pub enum CapabilityError {
    /// An implementation is already registered for this interface.
    #[error("interface already registered: {0}")]
    DuplicateInterface(InterfaceId),

    /// The directory was already initialized; setup is single-shot.
    #[error("definition directory already initialized")]
    AlreadyInitialized,

    /// The directory has not been initialized yet.
    #[error("definition directory not initialized")]
    NotInitialized,

    /// No implementation is known for this interface.
    #[error("no definition for interface: {0}")]
    UnknownInterface(InterfaceId),
}
