// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
use thiserror::Error;

// Layer 3: Internal module imports
// (none)

/// Transport-level failures.
///
/// These are connectivity problems, not protocol outcomes: a rejected
/// join or refused lease arrives as a successful response frame, not as
/// a `TransportError`.
#[derive(Error, Debug, Clone)]
pub enum TransportError {
    /// The message stream is down; the connection handler will attempt
    /// recovery while the client stays connected.
    #[error("message stream disconnected")]
    Disconnected,

    /// The mesh endpoint could not be reached.
    #[error("mesh unavailable: {0}")]
    Unavailable(String),
}

impl TransportError {
    /// Whether reconnect/retry inside the owning component is the right
    /// response.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Disconnected | Self::Unavailable(_))
    }
}
