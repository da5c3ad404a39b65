//! View of the addressable leases backing locally-hosted activations.

// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
// (none)

// Layer 3: Internal module imports
use crate::addressable::{AddressableLease, AddressableReference};
use crate::lease::{AddressableLeaser, LeaseError};

/// The execution system's window onto the leases it must keep alive.
///
/// The mesh requires a host to retain the right to serve every actor it
/// has activated; the deactivation sweep uses this view to renew those
/// leases inline and to deactivate actors whose lease cannot be kept.
#[derive(Clone)]
pub struct ExecutionLeases {
    leaser: AddressableLeaser,
}

impl ExecutionLeases {
    /// Wrap the process-wide addressable leaser.
    pub fn new(leaser: AddressableLeaser) -> Self {
        Self { leaser }
    }

    /// Renew the lease for a hosted actor if its window is open.
    /// Failure means the host has lost the right to serve the actor.
    pub async fn ensure_current(
        &self,
        reference: &AddressableReference,
    ) -> Result<AddressableLease, LeaseError> {
        self.leaser.ensure_current(reference).await
    }

    /// Release the lease backing a deactivated actor.
    pub fn release(&self, reference: &AddressableReference) {
        self.leaser.release(reference);
    }
}
