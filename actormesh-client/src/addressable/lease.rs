// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// Layer 3: Internal module imports
use super::reference::AddressableReference;
use crate::util::NodeId;

/// Time-bounded right to route to (or host) one virtual actor.
///
/// Granted by the directory when an invocation is first routed to a
/// reference. The holder renews once `renew_at` has passed; once
/// `expires_at` has passed without renewal, the lease is dead and must
/// not be used for routing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressableLease {
    /// The actor this lease covers.
    pub reference: AddressableReference,
    /// Node currently hosting the actor.
    pub node_id: NodeId,
    /// Hard bound: the lease is unusable past this instant.
    pub expires_at: DateTime<Utc>,
    /// Renewal hint from the mesh; renew on the first tick past this.
    pub renew_at: DateTime<Utc>,
}

impl AddressableLease {
    /// Whether the lease has passed its hard expiry.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// Whether the lease has entered its renewal window.
    pub fn renewal_due(&self, now: DateTime<Utc>) -> bool {
        now >= self.renew_at
    }
}
