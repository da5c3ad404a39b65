//! Per-actor routing leases with an expiry-evicted cache.

// Layer 1: Standard library imports
use std::sync::Arc;

// Layer 2: Third-party crate imports
use dashmap::DashMap;
use tracing::debug;

// Layer 3: Internal module imports
use super::error::LeaseError;
use crate::addressable::{AddressableLease, AddressableReference};
use crate::node::LocalNode;
use crate::util::{renewal_point, SharedClock};
use crate::wire::{AddressableLeaseRequest, AddressableLeaseResponse, MeshTransport};

/// Caches the right to route to each actor this process talks to.
///
/// A cache miss acquires a lease from the mesh; a hit inside the renewal
/// window returns the cached lease and refreshes it in the background; an
/// expired entry is evicted lazily on the access that finds it. Memory
/// stays bounded because entries exist only for references the host
/// actually uses and die with their leases.
#[derive(Clone)]
pub struct AddressableLeaser {
    inner: Arc<AddressableLeaserInner>,
}

struct AddressableLeaserInner {
    transport: Arc<dyn MeshTransport>,
    local_node: Arc<LocalNode>,
    clock: SharedClock,
    cache: DashMap<AddressableReference, AddressableLease>,
    renewal_margin: f64,
}

impl AddressableLeaser {
    /// Create a leaser with an empty cache. `renewal_margin` is the
    /// fraction of lease duration remaining at which renewal becomes
    /// due; the mesh's renewal hint wins when earlier.
    pub fn new(
        transport: Arc<dyn MeshTransport>,
        local_node: Arc<LocalNode>,
        clock: SharedClock,
        renewal_margin: f64,
    ) -> Self {
        Self {
            inner: Arc::new(AddressableLeaserInner {
                transport,
                local_node,
                clock,
                cache: DashMap::new(),
                renewal_margin,
            }),
        }
    }

    /// The lease to route `reference` through, acquiring or refreshing
    /// as needed.
    pub async fn lease_for(
        &self,
        reference: &AddressableReference,
    ) -> Result<AddressableLease, LeaseError> {
        let now = self.inner.clock.now();

        if let Some(cached) = self.inner.cache.get(reference).map(|entry| entry.clone()) {
            if cached.is_expired(now) {
                self.inner.cache.remove(reference);
            } else {
                if cached.renewal_due(now) {
                    let leaser = self.clone();
                    let reference = reference.clone();
                    tokio::spawn(async move {
                        if let Err(error) = leaser.acquire(&reference).await {
                            debug!(%reference, %error, "background lease renewal failed");
                        }
                    });
                }
                return Ok(cached);
            }
        }

        self.acquire(reference).await
    }

    /// Like [`lease_for`](Self::lease_for), but a lease inside its
    /// renewal window is refreshed inline so the caller observes renewal
    /// failure. Used for the leases backing locally-hosted activations,
    /// where a failed renewal must deactivate the actor.
    pub async fn ensure_current(
        &self,
        reference: &AddressableReference,
    ) -> Result<AddressableLease, LeaseError> {
        let now = self.inner.clock.now();
        if let Some(cached) = self.inner.cache.get(reference).map(|entry| entry.clone()) {
            if !cached.is_expired(now) && !cached.renewal_due(now) {
                return Ok(cached);
            }
            self.inner.cache.remove(reference);
        }
        self.acquire(reference).await
    }

    /// Drop the cached lease for a reference, if any.
    pub fn release(&self, reference: &AddressableReference) {
        self.inner.cache.remove(reference);
    }

    /// Number of cached leases (live or awaiting lazy eviction).
    pub fn cached_count(&self) -> usize {
        self.inner.cache.len()
    }

    async fn acquire(
        &self,
        reference: &AddressableReference,
    ) -> Result<AddressableLease, LeaseError> {
        let node_id = self
            .inner
            .local_node
            .snapshot()
            .node_info
            .map(|info| info.id)
            .ok_or(LeaseError::NotJoined)?;

        let response = self
            .inner
            .transport
            .lease_addressable(AddressableLeaseRequest {
                node_id,
                reference: reference.clone(),
            })
            .await?;

        match response {
            AddressableLeaseResponse::Granted(mut lease) => {
                let now = self.inner.clock.now();
                lease.renew_at = renewal_point(
                    now,
                    lease.expires_at,
                    lease.renew_at,
                    self.inner.renewal_margin,
                );
                self.inner.cache.insert(reference.clone(), lease.clone());
                Ok(lease)
            }
            AddressableLeaseResponse::Refused { reason } => {
                Err(LeaseError::AddressableLeaseRefused {
                    reference: reference.clone(),
                    reason,
                })
            }
        }
    }
}
