//! The pending-call correlation table.
//!
//! Every outbound invocation parks a completion sink here keyed by its
//! message id. The entry is completed exactly once, normally by the
//! correlated response frame. When the deadline passes first, the
//! per-tick sweep completes it with a timeout instead, and stream
//! teardown fails whatever remains. Responses for unknown ids are
//! dropped and counted as strays.

// Layer 1: Standard library imports
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

// Layer 2: Third-party crate imports
use bytes::Bytes;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

// Layer 3: Internal module imports
use crate::addressable::AddressableReference;
use crate::invocation::error::InvocationError;
use crate::util::{MessageId, MessageSequence, SharedClock};
use crate::wire::{MessageContent, MessageFrame};

/// One outbound invocation ready for the wire.
#[derive(Debug, Clone)]
pub struct OutboundCall {
    /// The target actor.
    pub target: AddressableReference,
    /// Method on the target interface.
    pub method: String,
    /// Serialized argument list.
    pub args: Bytes,
    /// Instant past which the caller gives up.
    pub deadline: DateTime<Utc>,
}

/// Awaitable completion of one outbound call.
pub struct PendingReply {
    message_id: MessageId,
    rx: oneshot::Receiver<Result<Bytes, InvocationError>>,
}

impl PendingReply {
    /// The correlation id assigned to this call.
    pub fn message_id(&self) -> MessageId {
        self.message_id
    }

    /// Wait for whichever completes the call first: response, remote
    /// failure, timeout, or disconnect.
    pub async fn wait(self) -> Result<Bytes, InvocationError> {
        self.rx
            .await
            .unwrap_or(Err(InvocationError::Disconnected))
    }
}

struct PendingCall {
    deadline: DateTime<Utc>,
    completion: oneshot::Sender<Result<Bytes, InvocationError>>,
}

/// Owns the correlation table and the outbound half of the stream.
///
/// Cheap to clone; all clones share one table. Frames written while the
/// stream is down are parked in a backlog and flushed in order when the
/// connection handler reattaches a stream, so calls survive a reconnect
/// subject only to their own deadlines.
#[derive(Clone)]
pub struct MessageHandler {
    inner: Arc<MessageHandlerInner>,
}

struct MessageHandlerInner {
    clock: SharedClock,
    sequence: MessageSequence,
    pending: DashMap<MessageId, PendingCall>,
    outbound: RwLock<Option<mpsc::Sender<MessageFrame>>>,
    backlog: Mutex<Vec<MessageFrame>>,
    stray_responses: AtomicU64,
    timed_out: AtomicU64,
}

impl MessageHandler {
    /// Create a handler with no attached stream.
    pub fn new(clock: SharedClock) -> Self {
        Self {
            inner: Arc::new(MessageHandlerInner {
                clock,
                sequence: MessageSequence::new(),
                pending: DashMap::new(),
                outbound: RwLock::new(None),
                backlog: Mutex::new(Vec::new()),
                stray_responses: AtomicU64::new(0),
                timed_out: AtomicU64::new(0),
            }),
        }
    }

    /// Register a pending call and write its request frame.
    pub async fn send(&self, call: OutboundCall) -> PendingReply {
        let message_id = self.inner.sequence.next();
        let (tx, rx) = oneshot::channel();
        self.inner.pending.insert(
            message_id,
            PendingCall {
                deadline: call.deadline,
                completion: tx,
            },
        );

        self.write(MessageFrame {
            message_id,
            content: MessageContent::InvocationRequest {
                target: call.target,
                method: call.method,
                args: call.args,
                deadline: call.deadline,
            },
        })
        .await;

        PendingReply { message_id, rx }
    }

    /// Write an uncorrelated frame (a response to an inbound request).
    pub async fn send_frame(&self, frame: MessageFrame) {
        self.write(frame).await;
    }

    /// Attach the outbound half of a fresh stream, flushing any frames
    /// parked while disconnected.
    pub async fn attach_stream(&self, sender: mpsc::Sender<MessageFrame>) {
        *self.inner.outbound.write() = Some(sender.clone());
        // Drain repeatedly: a concurrent send may park a frame between
        // the sender swap and a single take.
        loop {
            let parked: Vec<MessageFrame> = std::mem::take(&mut *self.inner.backlog.lock());
            if parked.is_empty() {
                break;
            }
            let mut parked = parked.into_iter();
            while let Some(frame) = parked.next() {
                if let Err(error) = sender.send(frame).await {
                    // Stream died mid-flush; park everything unsent, in
                    // order, for the next reattach.
                    self.detach_stream();
                    let mut backlog = self.inner.backlog.lock();
                    let mut requeue = vec![error.0];
                    requeue.extend(parked);
                    requeue.append(&mut *backlog);
                    *backlog = requeue;
                    return;
                }
            }
        }
    }

    /// Forget the outbound stream; subsequent writes park in the backlog.
    pub fn detach_stream(&self) {
        *self.inner.outbound.write() = None;
    }

    /// Complete the pending call a response frame correlates to.
    ///
    /// An id with no pending entry (most often a call the timeout sweep
    /// already completed) is dropped and counted.
    pub fn on_inbound_response(&self, frame: MessageFrame) {
        let outcome = match frame.content {
            MessageContent::InvocationResponse { payload } => Ok(payload),
            MessageContent::InvocationFailure { kind, message } => {
                Err(InvocationError::Remote { kind, message })
            }
            MessageContent::InvocationRequest { .. } => {
                warn!(message_id = %frame.message_id, "inbound request routed to response path, dropping");
                return;
            }
        };

        match self.inner.pending.remove(&frame.message_id) {
            Some((_, call)) => {
                let _ = call.completion.send(outcome);
            }
            None => {
                self.inner.stray_responses.fetch_add(1, Ordering::Relaxed);
                debug!(message_id = %frame.message_id, "stray response dropped");
            }
        }
    }

    /// Per-tick sweep: complete every pending call whose deadline has
    /// passed with a timeout.
    pub fn tick(&self) {
        let now = self.inner.clock.now();
        let expired: Vec<MessageId> = self
            .inner
            .pending
            .iter()
            .filter(|entry| entry.value().deadline <= now)
            .map(|entry| *entry.key())
            .collect();

        for message_id in expired {
            if let Some((_, call)) = self.inner.pending.remove(&message_id) {
                self.inner.timed_out.fetch_add(1, Ordering::Relaxed);
                debug!(%message_id, "pending call timed out");
                let _ = call.completion.send(Err(InvocationError::Timeout));
            }
        }
    }

    /// Fail every remaining pending call. Used during client stop so no
    /// caller is left hanging.
    pub fn fail_all(&self) {
        let ids: Vec<MessageId> = self.inner.pending.iter().map(|entry| *entry.key()).collect();
        for message_id in ids {
            if let Some((_, call)) = self.inner.pending.remove(&message_id) {
                let _ = call.completion.send(Err(InvocationError::Disconnected));
            }
        }
    }

    /// Number of calls awaiting completion.
    pub fn pending_count(&self) -> usize {
        self.inner.pending.len()
    }

    /// Responses dropped for lack of a pending entry.
    pub fn stray_count(&self) -> u64 {
        self.inner.stray_responses.load(Ordering::Relaxed)
    }

    /// Calls completed by the timeout sweep.
    pub fn timeout_count(&self) -> u64 {
        self.inner.timed_out.load(Ordering::Relaxed)
    }

    async fn write(&self, frame: MessageFrame) {
        let sender = self.inner.outbound.read().clone();
        match sender {
            Some(sender) => {
                if let Err(error) = sender.send(frame).await {
                    debug!("stream closed during write, parking frame");
                    self.detach_stream();
                    self.inner.backlog.lock().push(error.0);
                }
            }
            None => self.inner.backlog.lock().push(frame),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::addressable::{ActorKey, InterfaceId};
    use crate::util::{Clock, ManualClock};
    use std::time::Duration;

    fn greeter_call(clock: &ManualClock, deadline_ms: i64) -> OutboundCall {
        OutboundCall {
            target: AddressableReference::new(InterfaceId::new("IGreeter"), ActorKey::from("a")),
            method: "hello".to_string(),
            args: Bytes::from_static(b"[]"),
            deadline: clock.now() + chrono::Duration::milliseconds(deadline_ms),
        }
    }

    fn handler_with_stream(
        clock: Arc<ManualClock>,
    ) -> (MessageHandler, mpsc::Receiver<MessageFrame>) {
        let handler = MessageHandler::new(clock);
        let (tx, rx) = mpsc::channel(16);
        *handler.inner.outbound.write() = Some(tx);
        (handler, rx)
    }

    #[tokio::test]
    async fn test_send_registers_pending_and_writes_frame() {
        let clock = Arc::new(ManualClock::starting_now());
        let (handler, mut wire) = handler_with_stream(Arc::clone(&clock));

        let reply = handler.send(greeter_call(&clock, 1000)).await;
        assert_eq!(handler.pending_count(), 1);

        let frame = wire.recv().await.unwrap();
        assert_eq!(frame.message_id, reply.message_id());
        assert!(matches!(
            frame.content,
            MessageContent::InvocationRequest { .. }
        ));
    }

    #[tokio::test]
    async fn test_response_completes_pending_call() {
        let clock = Arc::new(ManualClock::starting_now());
        let (handler, _wire) = handler_with_stream(Arc::clone(&clock));

        let reply = handler.send(greeter_call(&clock, 1000)).await;
        handler.on_inbound_response(MessageFrame {
            message_id: reply.message_id(),
            content: MessageContent::InvocationResponse {
                payload: Bytes::from_static(b"\"hi\""),
            },
        });

        let payload = reply.wait().await.unwrap();
        assert_eq!(payload, Bytes::from_static(b"\"hi\""));
        assert_eq!(handler.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_failure_frame_surfaces_remote_error() {
        let clock = Arc::new(ManualClock::starting_now());
        let (handler, _wire) = handler_with_stream(Arc::clone(&clock));

        let reply = handler.send(greeter_call(&clock, 1000)).await;
        handler.on_inbound_response(MessageFrame {
            message_id: reply.message_id(),
            content: MessageContent::InvocationFailure {
                kind: "not_found".to_string(),
                message: "gone".to_string(),
            },
        });

        match reply.wait().await {
            Err(InvocationError::Remote { kind, .. }) => assert_eq!(kind, "not_found"),
            other => panic!("expected remote error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_tick_times_out_expired_calls() {
        let clock = Arc::new(ManualClock::starting_now());
        let (handler, _wire) = handler_with_stream(Arc::clone(&clock));

        let reply = handler.send(greeter_call(&clock, 200)).await;
        clock.advance(Duration::from_millis(250));
        handler.tick();

        assert!(matches!(reply.wait().await, Err(InvocationError::Timeout)));
        assert_eq!(handler.pending_count(), 0);
        assert_eq!(handler.timeout_count(), 1);
    }

    #[tokio::test]
    async fn test_tick_spares_unexpired_calls() {
        let clock = Arc::new(ManualClock::starting_now());
        let (handler, _wire) = handler_with_stream(Arc::clone(&clock));

        let _reply = handler.send(greeter_call(&clock, 10_000)).await;
        handler.tick();
        assert_eq!(handler.pending_count(), 1);
        assert_eq!(handler.timeout_count(), 0);
    }

    #[tokio::test]
    async fn test_late_response_after_timeout_is_stray() {
        let clock = Arc::new(ManualClock::starting_now());
        let (handler, _wire) = handler_with_stream(Arc::clone(&clock));

        let reply = handler.send(greeter_call(&clock, 100)).await;
        let message_id = reply.message_id();
        clock.advance(Duration::from_millis(150));
        handler.tick();
        assert!(matches!(reply.wait().await, Err(InvocationError::Timeout)));

        // The response shows up anyway; it must be dropped, not double-complete.
        handler.on_inbound_response(MessageFrame {
            message_id,
            content: MessageContent::InvocationResponse {
                payload: Bytes::from_static(b"null"),
            },
        });
        assert_eq!(handler.stray_count(), 1);
    }

    #[tokio::test]
    async fn test_stray_response_with_no_call() {
        let clock = Arc::new(ManualClock::starting_now());
        let (handler, _wire) = handler_with_stream(clock);
        handler.on_inbound_response(MessageFrame {
            message_id: MessageId::from_raw(999),
            content: MessageContent::InvocationResponse {
                payload: Bytes::from_static(b"null"),
            },
        });
        assert_eq!(handler.stray_count(), 1);
    }

    #[tokio::test]
    async fn test_frames_park_while_detached_and_flush_on_attach() {
        let clock = Arc::new(ManualClock::starting_now());
        let handler = MessageHandler::new(Arc::clone(&clock) as _);

        let reply = handler.send(greeter_call(&clock, 5_000)).await;
        assert_eq!(handler.pending_count(), 1);

        // Stream comes up; the parked frame flushes in order.
        let (tx, mut rx) = mpsc::channel(16);
        handler.attach_stream(tx).await;
        let frame = rx.recv().await.unwrap();
        assert_eq!(frame.message_id, reply.message_id());
    }

    #[tokio::test]
    async fn test_fail_all_completes_with_disconnect() {
        let clock = Arc::new(ManualClock::starting_now());
        let (handler, _wire) = handler_with_stream(Arc::clone(&clock));

        let reply = handler.send(greeter_call(&clock, 5_000)).await;
        handler.fail_all();
        assert!(matches!(
            reply.wait().await,
            Err(InvocationError::Disconnected)
        ));
        assert_eq!(handler.pending_count(), 0);
    }
}
