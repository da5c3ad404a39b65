//! In-process mesh: a loopback directory and frame router.
//!
//! Implements [`MeshTransport`] entirely in memory for a mesh of one or
//! more local clients. Joins grant real lease terms, invocation frames
//! are routed to whichever node holds the addressable lease, and a small
//! fault panel lets tests script rejections, renewal failures, response
//! suppression, and stream drops.

// Layer 1: Standard library imports
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

// Layer 2: Third-party crate imports
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use uuid::Uuid;

// Layer 3: Internal module imports
use super::error::TransportError;
use super::frames::{
    AddressableLeaseRequest, AddressableLeaseResponse, JoinClusterRequest, JoinClusterResponse,
    LeaveClusterRequest, LeaveClusterResponse, MessageContent, MessageFrame, NodeLeaseTerms,
    RenewNodeLeaseRequest, RenewNodeLeaseResponse,
};
use super::traits::{MeshTransport, MessageStream};
use crate::addressable::{AddressableLease, AddressableReference, InterfaceId};
use crate::util::{MessageId, NodeId, SharedClock, SystemClock};

const STREAM_DEPTH: usize = 64;

struct NodeRecord {
    capabilities: BTreeSet<InterfaceId>,
    expires_at: DateTime<Utc>,
    deliver: Option<mpsc::Sender<MessageFrame>>,
}

#[derive(Default)]
struct FaultPanel {
    reject_joins: AtomicBool,
    fail_renewals: AtomicBool,
    suppress_responses: AtomicBool,
}

struct MeshInner {
    clock: SharedClock,
    node_lease_duration: chrono::Duration,
    addressable_lease_duration: chrono::Duration,
    nodes: DashMap<NodeId, NodeRecord>,
    owners: DashMap<AddressableReference, AddressableLease>,
    inflight: DashMap<MessageId, NodeId>,
    faults: FaultPanel,
}

/// Loopback mesh for tests and demos.
///
/// # Example
///
/// ```rust,ignore
/// let mesh = InProcessMesh::new();
/// let client = MeshClient::builder()
///     .transport(Arc::new(mesh.clone()))
///     .build()?;
/// ```
#[derive(Clone)]
pub struct InProcessMesh {
    inner: Arc<MeshInner>,
}

impl InProcessMesh {
    /// Create a mesh with 30-second node leases and 60-second
    /// addressable leases on the system clock.
    pub fn new() -> Self {
        Self::configured(
            Arc::new(SystemClock),
            Duration::from_secs(30),
            Duration::from_secs(60),
        )
    }

    /// Create a mesh on an injected clock with default lease durations.
    pub fn with_clock(clock: SharedClock) -> Self {
        Self::configured(clock, Duration::from_secs(30), Duration::from_secs(60))
    }

    /// Create a mesh with explicit clock and lease durations.
    pub fn configured(
        clock: SharedClock,
        node_lease: Duration,
        addressable_lease: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(MeshInner {
                clock,
                node_lease_duration: chrono::Duration::from_std(node_lease)
                    .unwrap_or(chrono::Duration::seconds(30)),
                addressable_lease_duration: chrono::Duration::from_std(addressable_lease)
                    .unwrap_or(chrono::Duration::seconds(60)),
                nodes: DashMap::new(),
                owners: DashMap::new(),
                inflight: DashMap::new(),
                faults: FaultPanel::default(),
            }),
        }
    }

    /// Reject every join attempt while set.
    pub fn reject_joins(&self, on: bool) {
        self.inner.faults.reject_joins.store(on, Ordering::SeqCst);
    }

    /// Report every node lease renewal as lost while set.
    pub fn fail_renewals(&self, on: bool) {
        self.inner.faults.fail_renewals.store(on, Ordering::SeqCst);
    }

    /// Drop invocation responses instead of routing them while set.
    pub fn suppress_responses(&self, on: bool) {
        self.inner.faults.suppress_responses.store(on, Ordering::SeqCst);
    }

    /// Kill every open stream. Clients observe a transport disconnect
    /// and may reconnect via `open_stream`.
    pub fn drop_streams(&self) {
        for mut record in self.inner.nodes.iter_mut() {
            record.deliver = None;
        }
    }

    /// Number of live (non-expired) members.
    pub fn member_count(&self) -> usize {
        let now = self.inner.clock.now();
        self.inner
            .nodes
            .iter()
            .filter(|record| record.expires_at >= now)
            .count()
    }

    /// Current owner of a reference, if any lease is on record.
    pub fn owner_of(&self, reference: &AddressableReference) -> Option<NodeId> {
        self.inner
            .owners
            .get(reference)
            .map(|lease| lease.node_id.clone())
    }

    fn place(&self, reference: &AddressableReference) -> Option<AddressableLease> {
        let now = self.inner.clock.now();
        let existing = self.inner.owners.get(reference).map(|lease| lease.clone());
        if let Some(existing) = existing {
            let node_alive = self
                .inner
                .nodes
                .get(&existing.node_id)
                .is_some_and(|record| record.expires_at >= now);
            if !existing.is_expired(now) && node_alive {
                if !existing.renewal_due(now) {
                    return Some(existing);
                }
                // Renewal: extend on the same host.
                return Some(self.grant(reference.clone(), existing.node_id, now));
            }
        }

        // Place on any live node advertising the interface.
        let host = self.inner.nodes.iter().find_map(|entry| {
            let record = entry.value();
            (record.expires_at >= now && record.capabilities.contains(&reference.interface))
                .then(|| entry.key().clone())
        })?;
        Some(self.grant(reference.clone(), host, now))
    }

    fn grant(
        &self,
        reference: AddressableReference,
        host: NodeId,
        now: DateTime<Utc>,
    ) -> AddressableLease {
        let lease = AddressableLease {
            reference: reference.clone(),
            node_id: host,
            expires_at: now + self.inner.addressable_lease_duration,
            renew_at: now + self.inner.addressable_lease_duration / 2,
        };
        self.inner.owners.insert(reference, lease.clone());
        lease
    }

    fn deliver_to(&self, node_id: &NodeId) -> Option<mpsc::Sender<MessageFrame>> {
        self.inner
            .nodes
            .get(node_id)
            .and_then(|record| record.deliver.clone())
    }

    async fn route(&self, origin: NodeId, frame: MessageFrame) {
        match &frame.content {
            MessageContent::InvocationRequest { target, .. } => {
                let Some(lease) = self.place(target) else {
                    debug!(%target, "no host for reference, failing invocation");
                    self.reply_unroutable(&origin, frame.message_id, target).await;
                    return;
                };
                self.inner.inflight.insert(frame.message_id, origin.clone());
                match self.deliver_to(&lease.node_id) {
                    Some(sender) => {
                        if sender.send(frame).await.is_err() {
                            warn!(node = %lease.node_id, "host stream closed, dropping invocation");
                        }
                    }
                    None => {
                        self.inner.inflight.remove(&frame.message_id);
                        self.reply_unroutable(&origin, frame.message_id, target).await;
                    }
                }
            }
            MessageContent::InvocationResponse { .. } | MessageContent::InvocationFailure { .. } => {
                let Some((_, caller)) = self.inner.inflight.remove(&frame.message_id) else {
                    debug!(message_id = %frame.message_id, "response with no inflight entry");
                    return;
                };
                if self.inner.faults.suppress_responses.load(Ordering::SeqCst) {
                    debug!(message_id = %frame.message_id, "suppressing response");
                    return;
                }
                if let Some(sender) = self.deliver_to(&caller) {
                    let _ = sender.send(frame).await;
                }
            }
        }
    }

    async fn reply_unroutable(
        &self,
        origin: &NodeId,
        message_id: MessageId,
        target: &AddressableReference,
    ) {
        if let Some(sender) = self.deliver_to(origin) {
            let _ = sender
                .send(MessageFrame {
                    message_id,
                    content: MessageContent::InvocationFailure {
                        kind: "unroutable".to_string(),
                        message: format!("no host for {target}"),
                    },
                })
                .await;
        }
    }
}

impl Default for InProcessMesh {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MeshTransport for InProcessMesh {
    async fn join_cluster(
        &self,
        request: JoinClusterRequest,
    ) -> Result<JoinClusterResponse, TransportError> {
        if self.inner.faults.reject_joins.load(Ordering::SeqCst) {
            return Ok(JoinClusterResponse::Rejected {
                reason: "join refused by directory".to_string(),
            });
        }

        let now = self.inner.clock.now();
        let node_id = NodeId::new(Uuid::new_v4().to_string());
        self.inner.nodes.insert(
            node_id.clone(),
            NodeRecord {
                capabilities: request.capabilities,
                expires_at: now + self.inner.node_lease_duration,
                deliver: None,
            },
        );
        debug!(%node_id, namespace = %request.namespace, "node joined");
        Ok(JoinClusterResponse::Granted(NodeLeaseTerms {
            node_id,
            expires_at: now + self.inner.node_lease_duration,
            renew_at: now + self.inner.node_lease_duration / 2,
        }))
    }

    async fn renew_node_lease(
        &self,
        request: RenewNodeLeaseRequest,
    ) -> Result<RenewNodeLeaseResponse, TransportError> {
        if self.inner.faults.fail_renewals.load(Ordering::SeqCst) {
            return Ok(RenewNodeLeaseResponse::Lost {
                reason: "renewal refused by directory".to_string(),
            });
        }

        let now = self.inner.clock.now();
        match self.inner.nodes.get_mut(&request.node_id) {
            Some(mut record) if record.expires_at >= now => {
                record.expires_at = now + self.inner.node_lease_duration;
                Ok(RenewNodeLeaseResponse::Renewed {
                    expires_at: record.expires_at,
                    renew_at: now + self.inner.node_lease_duration / 2,
                })
            }
            Some(_) => Ok(RenewNodeLeaseResponse::Lost {
                reason: "lease already expired".to_string(),
            }),
            None => Ok(RenewNodeLeaseResponse::Lost {
                reason: "unknown node".to_string(),
            }),
        }
    }

    async fn leave_cluster(
        &self,
        request: LeaveClusterRequest,
    ) -> Result<LeaveClusterResponse, TransportError> {
        self.inner.nodes.remove(&request.node_id);
        self.inner
            .owners
            .retain(|_, lease| lease.node_id != request.node_id);
        debug!(node_id = %request.node_id, "node left");
        Ok(LeaveClusterResponse)
    }

    async fn lease_addressable(
        &self,
        request: AddressableLeaseRequest,
    ) -> Result<AddressableLeaseResponse, TransportError> {
        match self.place(&request.reference) {
            Some(lease) => Ok(AddressableLeaseResponse::Granted(lease)),
            None => Ok(AddressableLeaseResponse::Refused {
                reason: format!("no host for {}", request.reference),
            }),
        }
    }

    async fn open_stream(&self, node_id: NodeId) -> Result<MessageStream, TransportError> {
        let (out_tx, mut out_rx) = mpsc::channel::<MessageFrame>(STREAM_DEPTH);
        let (in_tx, in_rx) = mpsc::channel::<MessageFrame>(STREAM_DEPTH);

        {
            let mut record = self
                .inner
                .nodes
                .get_mut(&node_id)
                .ok_or_else(|| TransportError::Unavailable("node not joined".to_string()))?;
            record.deliver = Some(in_tx);
        }

        let mesh = self.clone();
        let origin = node_id.clone();
        tokio::spawn(async move {
            while let Some(frame) = out_rx.recv().await {
                mesh.route(origin.clone(), frame).await;
            }
            debug!(node_id = %origin, "stream closed");
        });

        Ok(MessageStream {
            outbound: out_tx,
            inbound: in_rx,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::addressable::ActorKey;
    use bytes::Bytes;

    fn join_request() -> JoinClusterRequest {
        let mut capabilities = BTreeSet::new();
        capabilities.insert(InterfaceId::new("IGreeter"));
        JoinClusterRequest {
            namespace: "test".to_string(),
            capabilities,
        }
    }

    fn greeter_ref() -> AddressableReference {
        AddressableReference::new(InterfaceId::new("IGreeter"), ActorKey::from("a"))
    }

    async fn joined(mesh: &InProcessMesh) -> NodeLeaseTerms {
        match mesh.join_cluster(join_request()).await.unwrap() {
            JoinClusterResponse::Granted(terms) => terms,
            JoinClusterResponse::Rejected { reason } => panic!("rejected: {reason}"),
        }
    }

    #[tokio::test]
    async fn test_join_grants_lease_terms() {
        let mesh = InProcessMesh::new();
        let terms = joined(&mesh).await;
        assert!(terms.renew_at < terms.expires_at);
        assert_eq!(mesh.member_count(), 1);
    }

    #[tokio::test]
    async fn test_join_rejected_when_faulted() {
        let mesh = InProcessMesh::new();
        mesh.reject_joins(true);
        let response = mesh.join_cluster(join_request()).await.unwrap();
        assert!(matches!(response, JoinClusterResponse::Rejected { .. }));
    }

    #[tokio::test]
    async fn test_renewal_extends_lease() {
        let mesh = InProcessMesh::new();
        let terms = joined(&mesh).await;
        let renewed = mesh
            .renew_node_lease(RenewNodeLeaseRequest {
                node_id: terms.node_id,
            })
            .await
            .unwrap();
        assert!(matches!(renewed, RenewNodeLeaseResponse::Renewed { .. }));
    }

    #[tokio::test]
    async fn test_renewal_lost_when_faulted() {
        let mesh = InProcessMesh::new();
        let terms = joined(&mesh).await;
        mesh.fail_renewals(true);
        let renewed = mesh
            .renew_node_lease(RenewNodeLeaseRequest {
                node_id: terms.node_id,
            })
            .await
            .unwrap();
        assert!(matches!(renewed, RenewNodeLeaseResponse::Lost { .. }));
    }

    #[tokio::test]
    async fn test_renewal_unknown_node_is_lost() {
        let mesh = InProcessMesh::new();
        let renewed = mesh
            .renew_node_lease(RenewNodeLeaseRequest {
                node_id: NodeId::from("ghost"),
            })
            .await
            .unwrap();
        assert!(matches!(renewed, RenewNodeLeaseResponse::Lost { .. }));
    }

    #[tokio::test]
    async fn test_leave_is_idempotent() {
        let mesh = InProcessMesh::new();
        let terms = joined(&mesh).await;
        let request = LeaveClusterRequest {
            node_id: terms.node_id,
        };
        mesh.leave_cluster(request.clone()).await.unwrap();
        mesh.leave_cluster(request).await.unwrap();
        assert_eq!(mesh.member_count(), 0);
    }

    #[tokio::test]
    async fn test_addressable_lease_placed_on_capable_node() {
        let mesh = InProcessMesh::new();
        let terms = joined(&mesh).await;
        let response = mesh
            .lease_addressable(AddressableLeaseRequest {
                node_id: terms.node_id.clone(),
                reference: greeter_ref(),
            })
            .await
            .unwrap();
        match response {
            AddressableLeaseResponse::Granted(lease) => assert_eq!(lease.node_id, terms.node_id),
            AddressableLeaseResponse::Refused { reason } => panic!("refused: {reason}"),
        }
    }

    #[tokio::test]
    async fn test_addressable_lease_refused_without_host() {
        let mesh = InProcessMesh::new();
        let terms = joined(&mesh).await;
        let response = mesh
            .lease_addressable(AddressableLeaseRequest {
                node_id: terms.node_id,
                reference: AddressableReference::new(InterfaceId::new("IUnknown"), ActorKey::None),
            })
            .await
            .unwrap();
        assert!(matches!(response, AddressableLeaseResponse::Refused { .. }));
    }

    #[tokio::test]
    async fn test_invocation_round_trip_loops_back() {
        let mesh = InProcessMesh::new();
        let terms = joined(&mesh).await;
        let mut stream = mesh.open_stream(terms.node_id).await.unwrap();

        let request = MessageFrame {
            message_id: MessageId::from_raw(1),
            content: MessageContent::InvocationRequest {
                target: greeter_ref(),
                method: "hello".to_string(),
                args: Bytes::from_static(b"[]"),
                deadline: Utc::now() + chrono::Duration::seconds(5),
            },
        };
        stream.outbound.send(request.clone()).await.unwrap();

        // Single-node mesh: the request is routed back to us as host.
        let delivered = stream.inbound.recv().await.unwrap();
        assert_eq!(delivered, request);

        // Host answers; the response comes back to the caller.
        stream
            .outbound
            .send(MessageFrame {
                message_id: MessageId::from_raw(1),
                content: MessageContent::InvocationResponse {
                    payload: Bytes::from_static(b"\"hi\""),
                },
            })
            .await
            .unwrap();
        let response = stream.inbound.recv().await.unwrap();
        assert!(matches!(
            response.content,
            MessageContent::InvocationResponse { .. }
        ));
    }

    #[tokio::test]
    async fn test_suppressed_responses_are_dropped() {
        let mesh = InProcessMesh::new();
        let terms = joined(&mesh).await;
        let mut stream = mesh.open_stream(terms.node_id).await.unwrap();
        mesh.suppress_responses(true);

        stream
            .outbound
            .send(MessageFrame {
                message_id: MessageId::from_raw(2),
                content: MessageContent::InvocationRequest {
                    target: greeter_ref(),
                    method: "hello".to_string(),
                    args: Bytes::from_static(b"[]"),
                    deadline: Utc::now() + chrono::Duration::seconds(5),
                },
            })
            .await
            .unwrap();

        // The request is still delivered to the host.
        let delivered = stream.inbound.recv().await.unwrap();
        stream
            .outbound
            .send(MessageFrame {
                message_id: delivered.message_id,
                content: MessageContent::InvocationResponse {
                    payload: Bytes::from_static(b"null"),
                },
            })
            .await
            .unwrap();

        // But the response never comes back.
        let verdict =
            tokio::time::timeout(std::time::Duration::from_millis(100), stream.inbound.recv())
                .await;
        assert!(verdict.is_err());
    }

    #[tokio::test]
    async fn test_drop_streams_closes_inbound() {
        let mesh = InProcessMesh::new();
        let terms = joined(&mesh).await;
        let mut stream = mesh.open_stream(terms.node_id).await.unwrap();
        mesh.drop_streams();
        assert!(stream.inbound.recv().await.is_none());
    }
}
