//! Node membership lease: join, per-tick renewal, best-effort leave.

// Layer 1: Standard library imports
use std::sync::Arc;

// Layer 2: Third-party crate imports
use tracing::{debug, warn};

// Layer 3: Internal module imports
use super::error::LeaseError;
use crate::node::{LocalNode, NodeInfo};
use crate::util::{renewal_point, SharedClock};
use crate::wire::{
    JoinClusterRequest, JoinClusterResponse, LeaveClusterRequest, MeshTransport,
    RenewNodeLeaseRequest, RenewNodeLeaseResponse,
};

/// Acquires, renews, and releases this node's membership lease.
///
/// Renewal runs on the cooperative tick: a transient failure is retried
/// on the next tick, but the lease expiry is the hard bound. Once `now`
/// passes `lease_expires_at` without a successful renewal, the leaser
/// raises [`LeaseError::NodeLeaseRenewalFailed`] and the orchestrator
/// takes the client down.
#[derive(Clone)]
pub struct NodeLeaser {
    inner: Arc<NodeLeaserInner>,
}

struct NodeLeaserInner {
    transport: Arc<dyn MeshTransport>,
    local_node: Arc<LocalNode>,
    clock: SharedClock,
    namespace: String,
    renewal_margin: f64,
}

impl NodeLeaser {
    /// Create a leaser bound to the local node and transport.
    ///
    /// `renewal_margin` is the fraction of lease duration remaining at
    /// which renewal becomes due; the mesh's own renewal hint wins when
    /// earlier.
    pub fn new(
        transport: Arc<dyn MeshTransport>,
        local_node: Arc<LocalNode>,
        clock: SharedClock,
        namespace: impl Into<String>,
        renewal_margin: f64,
    ) -> Self {
        Self {
            inner: Arc::new(NodeLeaserInner {
                transport,
                local_node,
                clock,
                namespace: namespace.into(),
                renewal_margin,
            }),
        }
    }

    /// One join attempt. On success the granted identity and lease terms
    /// are written into the local node and returned.
    pub async fn join_cluster(&self) -> Result<NodeInfo, LeaseError> {
        let capabilities = self.inner.local_node.snapshot().capabilities;
        let response = self
            .inner
            .transport
            .join_cluster(JoinClusterRequest {
                namespace: self.inner.namespace.clone(),
                capabilities,
            })
            .await?;

        match response {
            JoinClusterResponse::Granted(terms) => {
                let now = self.inner.clock.now();
                let info = NodeInfo {
                    id: terms.node_id,
                    lease_expires_at: terms.expires_at,
                    lease_renew_at: renewal_point(
                        now,
                        terms.expires_at,
                        terms.renew_at,
                        self.inner.renewal_margin,
                    ),
                };
                debug!(node_id = %info.id, "joined cluster");
                let written = info.clone();
                self.inner.local_node.manipulate(move |mut status| {
                    status.node_info = Some(written);
                    status
                });
                Ok(info)
            }
            JoinClusterResponse::Rejected { reason } => Err(LeaseError::JoinRejected { reason }),
        }
    }

    /// Per-tick renewal check.
    ///
    /// No-op before the renewal window opens. A transient transport
    /// failure inside the window is only logged (the tick cadence is
    /// the retry loop) until expiry makes it terminal.
    pub async fn tick(&self) -> Result<(), LeaseError> {
        let snapshot = self.inner.local_node.snapshot();
        let Some(info) = snapshot.node_info else {
            return Ok(());
        };

        let now = self.inner.clock.now();
        if now < info.lease_renew_at {
            return Ok(());
        }

        let outcome = self
            .inner
            .transport
            .renew_node_lease(RenewNodeLeaseRequest {
                node_id: info.id.clone(),
            })
            .await;

        match outcome {
            Ok(RenewNodeLeaseResponse::Renewed {
                expires_at,
                renew_at,
            }) => {
                debug!(node_id = %info.id, %expires_at, "node lease renewed");
                let renew_at = renewal_point(now, expires_at, renew_at, self.inner.renewal_margin);
                self.inner.local_node.manipulate(move |mut status| {
                    if let Some(info) = status.node_info.as_mut() {
                        info.lease_expires_at = expires_at;
                        info.lease_renew_at = renew_at;
                    }
                    status
                });
                Ok(())
            }
            Ok(RenewNodeLeaseResponse::Lost { reason }) => {
                Err(LeaseError::NodeLeaseRenewalFailed { reason })
            }
            Err(transport_error) => {
                if now > info.lease_expires_at {
                    Err(LeaseError::NodeLeaseRenewalFailed {
                        reason: format!("lease expired during outage: {transport_error}"),
                    })
                } else {
                    warn!(error = %transport_error, "node lease renewal failed, will retry next tick");
                    Ok(())
                }
            }
        }
    }

    /// Best-effort departure notice; idempotent, never fails the caller.
    pub async fn leave_cluster(&self) {
        let Some(info) = self.inner.local_node.snapshot().node_info else {
            return;
        };
        match self
            .inner
            .transport
            .leave_cluster(LeaveClusterRequest { node_id: info.id })
            .await
        {
            Ok(_) => debug!("left cluster"),
            Err(error) => warn!(%error, "leave_cluster failed, continuing shutdown"),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::addressable::InterfaceId;
    use crate::util::{ManualClock, SystemClock};
    use crate::wire::InProcessMesh;
    use std::time::Duration;

    fn local_node_with_capability() -> Arc<LocalNode> {
        let node = Arc::new(LocalNode::new());
        node.manipulate(|mut status| {
            status.capabilities.insert(InterfaceId::new("IGreeter"));
            status
        });
        node
    }

    #[tokio::test]
    async fn test_join_writes_node_info() {
        let mesh = InProcessMesh::new();
        let local = local_node_with_capability();
        let leaser = NodeLeaser::new(
            Arc::new(mesh),
            Arc::clone(&local),
            Arc::new(SystemClock),
            "test",
            0.5,
        );

        let info = leaser.join_cluster().await.unwrap();
        let snapshot = local.snapshot();
        assert_eq!(snapshot.node_info.unwrap().id, info.id);
    }

    #[tokio::test]
    async fn test_join_rejected_surfaces_error() {
        let mesh = InProcessMesh::new();
        mesh.reject_joins(true);
        let leaser = NodeLeaser::new(
            Arc::new(mesh),
            local_node_with_capability(),
            Arc::new(SystemClock),
            "test",
            0.5,
        );
        assert!(matches!(
            leaser.join_cluster().await,
            Err(LeaseError::JoinRejected { .. })
        ));
    }

    #[tokio::test]
    async fn test_tick_is_noop_before_renewal_window() {
        let clock = Arc::new(ManualClock::starting_now());
        let mesh = InProcessMesh::with_clock(Arc::clone(&clock) as _);
        let local = local_node_with_capability();
        let leaser = NodeLeaser::new(Arc::new(mesh), Arc::clone(&local), clock, "test", 0.5);

        leaser.join_cluster().await.unwrap();
        let before = local.snapshot().node_info.unwrap();
        leaser.tick().await.unwrap();
        assert_eq!(local.snapshot().node_info.unwrap(), before);
    }

    #[tokio::test]
    async fn test_tick_renews_once_window_open() {
        let clock = Arc::new(ManualClock::starting_now());
        let mesh = InProcessMesh::with_clock(Arc::clone(&clock) as _);
        let local = local_node_with_capability();
        let leaser =
            NodeLeaser::new(Arc::new(mesh), Arc::clone(&local), Arc::clone(&clock) as _, "test", 0.5);

        leaser.join_cluster().await.unwrap();
        let before = local.snapshot().node_info.unwrap();

        // Default node lease is 30s with renewal due at 15s.
        clock.advance(Duration::from_secs(16));
        leaser.tick().await.unwrap();

        let after = local.snapshot().node_info.unwrap();
        assert!(after.lease_expires_at > before.lease_expires_at);
    }

    #[tokio::test]
    async fn test_lost_renewal_is_fatal() {
        let clock = Arc::new(ManualClock::starting_now());
        let mesh = InProcessMesh::with_clock(Arc::clone(&clock) as _);
        let local = local_node_with_capability();
        let leaser = NodeLeaser::new(
            Arc::new(mesh.clone()),
            local,
            Arc::clone(&clock) as _,
            "test",
            0.5,
        );

        leaser.join_cluster().await.unwrap();
        mesh.fail_renewals(true);
        clock.advance(Duration::from_secs(16));

        let err = leaser.tick().await.unwrap_err();
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn test_leave_without_join_is_noop() {
        let mesh = InProcessMesh::new();
        let leaser = NodeLeaser::new(
            Arc::new(mesh),
            Arc::new(LocalNode::new()),
            Arc::new(SystemClock),
            "test",
            0.5,
        );
        leaser.leave_cluster().await;
    }

    #[tokio::test]
    async fn test_leave_twice_is_idempotent() {
        let mesh = InProcessMesh::new();
        let leaser = NodeLeaser::new(
            Arc::new(mesh),
            local_node_with_capability(),
            Arc::new(SystemClock),
            "test",
            0.5,
        );
        leaser.join_cluster().await.unwrap();
        leaser.leave_cluster().await;
        leaser.leave_cluster().await;
    }
}
