//! Owns the bidirectional stream to the mesh.

// Layer 1: Standard library imports
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

// Layer 2: Third-party crate imports
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rand::Rng;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

// Layer 3: Internal module imports
use crate::invocation::InvocationSystem;
use crate::message::MessageHandler;
use crate::node::{ClientState, LocalNode};
use crate::util::SharedClock;
use crate::wire::{MeshTransport, MessageContent, TransportError};

/// Reconnect attempts multiply their delay by up to this much, so a
/// burst of clients does not retry in lockstep.
const JITTER_FACTOR: f64 = 1.2;

struct BackoffState {
    current: Duration,
    next_attempt_at: Option<DateTime<Utc>>,
}

/// Opens the message stream once the node has joined, demultiplexes
/// inbound frames, and re-establishes the stream when the transport
/// drops it while the client is connected.
///
/// A reconnect preserves the node identity and every pending call:
/// outbound frames written while the stream is down are parked by the
/// message handler and flushed on reattach, bounded only by each call's
/// own deadline. Reconnect attempts back off exponentially with jitter
/// and stop once the node lease has expired, at which point the lease
/// failure path owns recovery.
#[derive(Clone)]
pub struct ConnectionHandler {
    inner: Arc<ConnectionHandlerInner>,
}

struct ConnectionHandlerInner {
    transport: Arc<dyn MeshTransport>,
    local_node: Arc<LocalNode>,
    clock: SharedClock,
    message_handler: MessageHandler,
    invocations: InvocationSystem,
    pump: Mutex<Option<JoinHandle<()>>>,
    stream_up: Arc<AtomicBool>,
    backoff: Mutex<BackoffState>,
    initial_backoff: Duration,
    max_backoff: Duration,
}

impl ConnectionHandler {
    /// Create a handler; no stream exists until [`connect`](Self::connect).
    pub fn new(
        transport: Arc<dyn MeshTransport>,
        local_node: Arc<LocalNode>,
        clock: SharedClock,
        message_handler: MessageHandler,
        invocations: InvocationSystem,
        initial_backoff: Duration,
        max_backoff: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(ConnectionHandlerInner {
                transport,
                local_node,
                clock,
                message_handler,
                invocations,
                pump: Mutex::new(None),
                stream_up: Arc::new(AtomicBool::new(false)),
                backoff: Mutex::new(BackoffState {
                    current: initial_backoff,
                    next_attempt_at: None,
                }),
                initial_backoff,
                max_backoff,
            }),
        }
    }

    /// Open the stream and start pumping inbound frames.
    pub async fn connect(&self) -> Result<(), TransportError> {
        let node_id = self
            .inner
            .local_node
            .snapshot()
            .node_info
            .map(|info| info.id)
            .ok_or_else(|| TransportError::Unavailable("node has not joined".to_string()))?;

        let stream = self.inner.transport.open_stream(node_id).await?;
        self.inner
            .message_handler
            .attach_stream(stream.outbound)
            .await;

        let mut inbound = stream.inbound;
        let message_handler = self.inner.message_handler.clone();
        let invocations = self.inner.invocations.clone();
        let stream_up = Arc::clone(&self.inner.stream_up);
        let pump = tokio::spawn(async move {
            while let Some(frame) = inbound.recv().await {
                match &frame.content {
                    MessageContent::InvocationRequest { .. } => {
                        // Dispatch off the pump so a slow actor cannot
                        // stall frame demultiplexing.
                        let invocations = invocations.clone();
                        tokio::spawn(async move {
                            invocations.handle_inbound(frame).await;
                        });
                    }
                    MessageContent::InvocationResponse { .. }
                    | MessageContent::InvocationFailure { .. } => {
                        message_handler.on_inbound_response(frame);
                    }
                }
            }
            // Transport closed its half.
            stream_up.store(false, Ordering::SeqCst);
            message_handler.detach_stream();
            debug!("inbound stream closed");
        });

        if let Some(old) = self.inner.pump.lock().replace(pump) {
            old.abort();
        }
        self.inner.stream_up.store(true, Ordering::SeqCst);
        self.reset_backoff();
        Ok(())
    }

    /// Per-tick liveness check; attempts a jittered-backoff reconnect
    /// when the stream is down.
    pub async fn tick(&self) {
        if self.inner.stream_up.load(Ordering::SeqCst) {
            return;
        }

        let snapshot = self.inner.local_node.snapshot();
        if snapshot.client_state != ClientState::Connected {
            return;
        }
        let Some(info) = snapshot.node_info else {
            return;
        };

        let now = self.inner.clock.now();
        if now > info.lease_expires_at {
            // The membership lease is gone; renewal failure will take
            // the client down. Reconnecting would be pointless.
            debug!("skipping reconnect, node lease expired");
            return;
        }
        {
            let backoff = self.inner.backoff.lock();
            if let Some(next_attempt_at) = backoff.next_attempt_at {
                if now < next_attempt_at {
                    return;
                }
            }
        }

        match self.connect().await {
            Ok(()) => info!("message stream re-established"),
            Err(error) => {
                let delay = self.grow_backoff(now);
                warn!(%error, ?delay, "reconnect failed, backing off");
            }
        }
    }

    /// Close the stream; later inbound frames are discarded.
    pub async fn disconnect(&self) {
        if let Some(pump) = self.inner.pump.lock().take() {
            pump.abort();
        }
        self.inner.stream_up.store(false, Ordering::SeqCst);
        self.inner.message_handler.detach_stream();
        debug!("disconnected");
    }

    /// Whether the stream is currently believed live.
    pub fn is_connected(&self) -> bool {
        self.inner.stream_up.load(Ordering::SeqCst)
    }

    fn reset_backoff(&self) {
        let mut backoff = self.inner.backoff.lock();
        backoff.current = self.inner.initial_backoff;
        backoff.next_attempt_at = None;
    }

    fn grow_backoff(&self, now: DateTime<Utc>) -> Duration {
        let mut backoff = self.inner.backoff.lock();
        let jitter = rand::thread_rng().gen_range(1.0..JITTER_FACTOR);
        let delay = Duration::from_secs_f64(backoff.current.as_secs_f64() * jitter);
        backoff.next_attempt_at =
            Some(now + chrono::Duration::from_std(delay).unwrap_or_else(|_| chrono::Duration::seconds(1)));
        backoff.current = (backoff.current * 2).min(self.inner.max_backoff);
        delay
    }
}
