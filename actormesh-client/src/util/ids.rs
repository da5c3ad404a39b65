// Layer 1: Standard library imports
use std::fmt::{self, Display};
use std::sync::atomic::{AtomicU64, Ordering};

// Layer 2: Third-party crate imports
use serde::{Deserialize, Serialize};

// Layer 3: Internal module imports
// (none)

/// Identity of this process within the mesh.
///
/// Assigned by the directory when the node joins the cluster; the client
/// never mints its own. Treated as an opaque token locally and echoed back
/// on every lease and stream operation.
///
/// # Example
/// ```rust
/// use actormesh_client::util::NodeId;
///
/// let id = NodeId::from("node-7f3a");
/// assert_eq!(id.as_str(), "node-7f3a");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId(String);

impl NodeId {
    /// Wrap a mesh-assigned identity token.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// View the underlying token.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for NodeId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl From<String> for NodeId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Correlation identifier for one outbound or inbound message frame.
///
/// Unique within the process lifetime and strictly monotonic, which makes
/// it usable both as the correlation key in the pending-call table and as
/// an ordering witness in tests.
///
/// # Example
/// ```rust
/// use actormesh_client::util::MessageSequence;
///
/// let seq = MessageSequence::new();
/// let a = seq.next();
/// let b = seq.next();
/// assert!(a < b);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MessageId(u64);

impl MessageId {
    /// Reconstruct a MessageId received on the wire.
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw sequence value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Monotonic generator for [`MessageId`]s.
///
/// A single atomic counter shared by everything in the process that emits
/// frames; ids are never reused.
#[derive(Debug, Default)]
pub struct MessageSequence(AtomicU64);

impl MessageSequence {
    /// Create a sequence starting at 1.
    pub fn new() -> Self {
        Self(AtomicU64::new(1))
    }

    /// Claim the next id.
    pub fn next(&self) -> MessageId {
        MessageId(self.0.fetch_add(1, Ordering::Relaxed))
    }
}
