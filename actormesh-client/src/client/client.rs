//! The client orchestrator: explicit construction in dependency order,
//! linear startup, composite tick, graceful stop.

// Layer 1: Standard library imports
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

// Layer 2: Third-party crate imports
use tracing::{debug, info, warn};

// Layer 3: Internal module imports
use super::config::ClientConfig;
use super::error::ClientError;
use crate::addressable::{
    ActorKey, AddressableConstructor, AddressableReference, Deactivator, InterfaceId,
};
use crate::capability::{CapabilityError, CapabilityScanner, DefinitionDirectory};
use crate::connection::ConnectionHandler;
use crate::execution::{ExecutionLeases, ExecutionSystem};
use crate::invocation::{ActorProxy, InvocationSystem};
use crate::lease::{AddressableLeaser, LeaseError, NodeLeaser};
use crate::message::MessageHandler;
use crate::node::{ClientState, LocalNode, NodeStatus};
use crate::serializer::{JsonSerializer, Serializer};
use crate::ticker::{TickFlow, Ticker};
use crate::util::{SharedClock, SystemClock};
use crate::wire::MeshTransport;

/// Host callback invoked once when the node lease is irrecoverably
/// lost. Typical handlers trigger process-level remediation.
pub type NodeLeaseLostHandler = Arc<dyn Fn() + Send + Sync>;

/// Builder for [`MeshClient`].
///
/// The transport is the one required piece; serializer and clock default
/// to [`JsonSerializer`] and the system clock. The substitution methods
/// double as the testing seam in place of a DI container.
pub struct MeshClientBuilder {
    config: ClientConfig,
    transport: Option<Arc<dyn MeshTransport>>,
    serializer: Arc<dyn Serializer>,
    clock: SharedClock,
    deactivator: Option<Deactivator>,
    lease_lost_handler: Option<NodeLeaseLostHandler>,
}

impl Default for MeshClientBuilder {
    fn default() -> Self {
        Self {
            config: ClientConfig::default(),
            transport: None,
            serializer: Arc::new(JsonSerializer::new()),
            clock: Arc::new(SystemClock),
            deactivator: None,
            lease_lost_handler: None,
        }
    }
}

impl MeshClientBuilder {
    /// Use this configuration.
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    /// Use this transport (required).
    pub fn transport(mut self, transport: Arc<dyn MeshTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Substitute the wire-format serializer.
    pub fn serializer(mut self, serializer: Arc<dyn Serializer>) -> Self {
        self.serializer = serializer;
        self
    }

    /// Substitute the time source.
    pub fn clock(mut self, clock: SharedClock) -> Self {
        self.clock = clock;
        self
    }

    /// Host callback run while activations deactivate.
    pub fn deactivator(mut self, deactivator: Deactivator) -> Self {
        self.deactivator = Some(deactivator);
        self
    }

    /// Host callback for irrecoverable node-lease loss.
    pub fn lease_lost_handler(mut self, handler: NodeLeaseLostHandler) -> Self {
        self.lease_lost_handler = Some(handler);
        self
    }

    /// Construct the client, wiring components in dependency order.
    pub fn build(self) -> Result<MeshClient, ClientError> {
        self.config.validate().map_err(ClientError::Config)?;
        let transport = self
            .transport
            .ok_or_else(|| ClientError::Config("transport is required".to_string()))?;

        let local_node = Arc::new(LocalNode::new());
        let scanner = CapabilityScanner::new();
        let directory = Arc::new(DefinitionDirectory::new());

        let node_leaser = NodeLeaser::new(
            Arc::clone(&transport),
            Arc::clone(&local_node),
            Arc::clone(&self.clock),
            self.config.namespace.clone(),
            self.config.lease_renewal_margin,
        );
        let addressable_leaser = AddressableLeaser::new(
            Arc::clone(&transport),
            Arc::clone(&local_node),
            Arc::clone(&self.clock),
            self.config.lease_renewal_margin,
        );
        let message_handler = MessageHandler::new(Arc::clone(&self.clock));
        let execution = ExecutionSystem::new(
            Arc::clone(&directory),
            ExecutionLeases::new(addressable_leaser.clone()),
            Arc::clone(&self.clock),
            self.config.pool,
            self.config.addressable_ttl,
            self.deactivator,
        );
        let invocations = InvocationSystem::new(
            self.serializer,
            message_handler.clone(),
            execution.clone(),
            addressable_leaser,
            Arc::clone(&self.clock),
            self.config.invocation_deadline,
        );
        let connection = ConnectionHandler::new(
            transport,
            Arc::clone(&local_node),
            Arc::clone(&self.clock),
            message_handler.clone(),
            invocations.clone(),
            self.config.reconnect_backoff_initial,
            self.config.reconnect_backoff_max,
        );

        Ok(MeshClient {
            inner: Arc::new(ClientInner {
                config: self.config,
                local_node,
                scanner,
                directory,
                node_leaser,
                message_handler,
                execution,
                invocations,
                connection,
                ticker: parking_lot::Mutex::new(None),
                stop_gate: tokio::sync::Mutex::new(()),
                lease_lost_handler: self.lease_lost_handler,
                lease_lost_fired: AtomicBool::new(false),
            }),
        })
    }
}

/// The client-side runtime of the virtual-actor mesh.
///
/// One instance runs one lifecycle: [`start`](Self::start) joins the
/// mesh and begins ticking, [`stop`](Self::stop) drains and leaves. A
/// stopped client is terminal; build a new one to rejoin.
#[derive(Clone)]
pub struct MeshClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    config: ClientConfig,
    local_node: Arc<LocalNode>,
    scanner: CapabilityScanner,
    directory: Arc<DefinitionDirectory>,
    node_leaser: NodeLeaser,
    message_handler: MessageHandler,
    execution: ExecutionSystem,
    invocations: InvocationSystem,
    connection: ConnectionHandler,
    ticker: parking_lot::Mutex<Option<Ticker>>,
    stop_gate: tokio::sync::Mutex<()>,
    lease_lost_handler: Option<NodeLeaseLostHandler>,
    lease_lost_fired: AtomicBool,
}

impl MeshClient {
    /// Create a builder.
    pub fn builder() -> MeshClientBuilder {
        MeshClientBuilder::default()
    }

    /// Register an actor interface this process can host. Only legal
    /// before [`start`](Self::start).
    pub fn register_addressable(
        &self,
        interface: InterfaceId,
        constructor: AddressableConstructor,
    ) -> Result<(), ClientError> {
        if self.inner.local_node.client_state() != ClientState::Idle {
            return Err(ClientError::AlreadyStarted);
        }
        self.inner.scanner.register(interface, constructor)?;
        Ok(())
    }

    /// Handle for invoking one virtual actor.
    pub fn proxy(&self, interface: InterfaceId, key: ActorKey) -> ActorProxy {
        ActorProxy::new(
            AddressableReference::new(interface, key),
            self.inner.invocations.clone(),
        )
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ClientState {
        self.inner.local_node.client_state()
    }

    /// Outbound calls awaiting completion.
    pub fn pending_count(&self) -> usize {
        self.inner.message_handler.pending_count()
    }

    /// Live host-side activations.
    pub fn activation_count(&self) -> usize {
        self.inner.execution.activation_count()
    }

    /// Responses dropped for lack of a pending call.
    pub fn stray_count(&self) -> u64 {
        self.inner.message_handler.stray_count()
    }

    /// Join the mesh and start ticking.
    ///
    /// Scan capabilities, set up the definition directory, join the
    /// cluster (retrying per the configured policy), open the message
    /// stream, then hand periodic work to the ticker. On join
    /// exhaustion the node resets to idle and
    /// [`ClientError::ClusterJoinFailed`] is returned.
    pub async fn start(&self) -> Result<(), ClientError> {
        if !self.inner.local_node.try_transition(ClientState::Connecting) {
            return Err(ClientError::AlreadyStarted);
        }

        // Directory setup is single-shot; a start retried after a join
        // failure reuses the definitions already installed.
        let scan = self.inner.scanner.scan();
        if let Err(CapabilityError::NotInitialized) = self.inner.directory.generate_capabilities() {
            self.inner.directory.setup_definition(scan)?;
        }
        let capabilities = self.inner.directory.generate_capabilities()?;
        self.inner.local_node.manipulate(move |mut status| {
            status.capabilities = capabilities;
            status
        });

        let mut attempt = 0u32;
        loop {
            // The retry loop is cancelable by transitioning the node out
            // of connecting.
            if self.inner.local_node.client_state() != ClientState::Connecting {
                return Err(ClientError::StartCancelled);
            }
            attempt += 1;
            match self.inner.node_leaser.join_cluster().await {
                Ok(info) => {
                    debug!(node_id = %info.id, attempt, "cluster join succeeded");
                    break;
                }
                Err(error) => {
                    if attempt >= self.inner.config.join_attempts {
                        warn!(%error, attempts = attempt, "cluster join attempts exhausted");
                        self.inner.local_node.reset();
                        return Err(ClientError::ClusterJoinFailed { attempts: attempt });
                    }
                    debug!(%error, attempt, "join attempt failed, retrying");
                    tokio::time::sleep(self.inner.config.join_delay).await;
                }
            }
        }

        if let Err(error) = self.inner.connection.connect().await {
            self.inner.node_leaser.leave_cluster().await;
            self.inner.local_node.reset();
            return Err(error.into());
        }

        if !self.inner.local_node.try_transition(ClientState::Connected) {
            self.inner.connection.disconnect().await;
            self.inner.node_leaser.leave_cluster().await;
            self.inner.local_node.reset();
            return Err(ClientError::StartCancelled);
        }

        let weak = Arc::downgrade(&self.inner);
        let ticker = Ticker::start(self.inner.config.tick_rate, move || {
            let weak = weak.clone();
            Box::pin(async move {
                match weak.upgrade() {
                    Some(inner) => ClientInner::composite_tick(&inner).await,
                    None => TickFlow::Stop,
                }
            })
        });
        *self.inner.ticker.lock() = Some(ticker);

        info!(namespace = %self.inner.config.namespace, "client connected");
        Ok(())
    }

    /// Graceful stop with the deactivator configured at build time.
    pub async fn stop(&self) -> Result<(), ClientError> {
        self.stop_with(None).await
    }

    /// Graceful stop, overriding the deactivator for this drain.
    ///
    /// Leaves the cluster (best effort), drains every activation up to
    /// the stop deadline, stops the ticker, closes the stream, fails
    /// any still-pending calls, and resets the node to the terminal
    /// stopped state. Idempotent once stopping has begun.
    pub async fn stop_with(&self, deactivator: Option<Deactivator>) -> Result<(), ClientError> {
        match self.inner.local_node.client_state() {
            ClientState::Connected => {
                self.inner.local_node.try_transition(ClientState::Stopping);
            }
            ClientState::Stopping => {}
            ClientState::Stopped => return Ok(()),
            ClientState::Connecting => {
                // Cancel startup: the join retry loop observes the exit
                // from connecting and returns StartCancelled.
                self.inner.local_node.try_transition(ClientState::Idle);
                return Ok(());
            }
            ClientState::Idle => return Err(ClientError::NotRunning),
        }
        ClientInner::teardown(&self.inner, deactivator).await;
        Ok(())
    }
}

impl ClientInner {
    /// One pass of periodic work, in the fixed order: connection
    /// recovery, node lease renewal, call timeouts, execution sweep.
    async fn composite_tick(inner: &Arc<ClientInner>) -> TickFlow {
        inner.connection.tick().await;

        if let Err(error) = inner.node_leaser.tick().await {
            if error.is_fatal() && inner.local_node.client_state() == ClientState::Connected {
                return Self::on_lease_lost(inner, &error);
            }
            warn!(%error, "node leaser tick error");
        }

        inner.message_handler.tick();
        inner.execution.tick().await;
        TickFlow::Continue
    }

    /// Lifecycle-fatal path: the node lease is gone.
    fn on_lease_lost(inner: &Arc<ClientInner>, error: &LeaseError) -> TickFlow {
        warn!(%error, "node lease lost, stopping client");
        inner.local_node.try_transition(ClientState::Stopping);
        if !inner.lease_lost_fired.swap(true, Ordering::SeqCst) {
            if let Some(handler) = &inner.lease_lost_handler {
                handler();
            }
        }
        let inner = Arc::clone(inner);
        tokio::spawn(async move {
            ClientInner::teardown(&inner, None).await;
        });
        TickFlow::Stop
    }

    async fn teardown(inner: &Arc<ClientInner>, deactivator: Option<Deactivator>) {
        let _gate = inner.stop_gate.lock().await;
        if inner.local_node.client_state() == ClientState::Stopped {
            return;
        }

        inner.node_leaser.leave_cluster().await;
        inner
            .execution
            .stop(deactivator, inner.config.stop_deadline)
            .await;

        let ticker = inner.ticker.lock().take();
        if let Some(ticker) = ticker {
            ticker.stop().await;
        }

        inner.connection.disconnect().await;
        inner.message_handler.fail_all();

        inner.local_node.manipulate(|_| {
            let mut status = NodeStatus::default();
            status.client_state = ClientState::Stopped;
            status
        });
        info!("client stopped");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::addressable::{ActorError, Addressable};
    use crate::wire::InProcessMesh;
    use async_trait::async_trait;
    use serde_json::Value;

    struct Noop;

    #[async_trait]
    impl Addressable for Noop {
        async fn on_invoke(&mut self, _m: &str, _a: Vec<Value>) -> Result<Value, ActorError> {
            Ok(Value::Null)
        }
    }

    fn built_client() -> MeshClient {
        MeshClient::builder()
            .transport(Arc::new(InProcessMesh::new()))
            .build()
            .unwrap()
    }

    #[test]
    fn test_build_requires_transport() {
        let result = MeshClient::builder().build();
        assert!(matches!(result, Err(ClientError::Config(_))));
    }

    #[test]
    fn test_build_rejects_invalid_config() {
        let mut config = ClientConfig::default();
        config.pool = 0;
        let result = MeshClient::builder()
            .config(config)
            .transport(Arc::new(InProcessMesh::new()))
            .build();
        assert!(matches!(result, Err(ClientError::Config(_))));
    }

    #[tokio::test]
    async fn test_new_client_is_idle() {
        let client = built_client();
        assert_eq!(client.state(), ClientState::Idle);
        assert_eq!(client.pending_count(), 0);
        assert_eq!(client.activation_count(), 0);
    }

    #[tokio::test]
    async fn test_register_addressable_before_start() {
        let client = built_client();
        client
            .register_addressable(InterfaceId::new("INoop"), Arc::new(|_| Ok(Box::new(Noop))))
            .unwrap();
    }

    #[tokio::test]
    async fn test_stop_before_start_is_error() {
        let client = built_client();
        assert!(matches!(
            client.stop().await,
            Err(ClientError::NotRunning)
        ));
    }

    #[tokio::test]
    async fn test_proxy_is_available_before_start() {
        let client = built_client();
        let proxy = client.proxy(InterfaceId::new("INoop"), ActorKey::from("k"));
        assert_eq!(proxy.reference().interface, InterfaceId::new("INoop"));
    }
}
