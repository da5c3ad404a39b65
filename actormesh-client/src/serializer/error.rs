// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
use thiserror::Error;

// Layer 3: Internal module imports
// (none)

/// Payload could not be encoded or decoded.
///
/// An invocation that hits this is failed with the same kind on both
/// sides of the wire; it is never retried by the runtime.
#[derive(Error, Debug)]
pub enum SerializationError {
    /// Arguments or result could not be encoded for the wire.
    #[error("failed to encode payload: {0}")]
    Encode(String),

    /// Inbound payload was malformed.
    #[error("failed to decode payload: {0}")]
    Decode(String),
}
