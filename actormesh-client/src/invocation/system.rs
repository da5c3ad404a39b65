//! Encodes outbound invocations and dispatches inbound ones.

// Layer 1: Standard library imports
use std::sync::Arc;
use std::time::Duration;

// Layer 2: Third-party crate imports
use serde_json::Value;
use tracing::warn;

// Layer 3: Internal module imports
use super::error::InvocationError;
use crate::addressable::AddressableReference;
use crate::execution::ExecutionSystem;
use crate::lease::AddressableLeaser;
use crate::message::{MessageHandler, OutboundCall};
use crate::serializer::Serializer;
use crate::util::SharedClock;
use crate::wire::{MessageContent, MessageFrame};

/// Converts between typed method calls and wire frames.
///
/// Outbound: resolve a routing lease, serialize the arguments, register
/// the call with the message handler, await the correlated completion,
/// deserialize the result. Inbound: decode the arguments, hand the
/// invocation to the execution system, and frame the result (or error,
/// with its kind tag intact) back on the same message id.
#[derive(Clone)]
pub struct InvocationSystem {
    inner: Arc<InvocationSystemInner>,
}

struct InvocationSystemInner {
    serializer: Arc<dyn Serializer>,
    message_handler: MessageHandler,
    execution: ExecutionSystem,
    leaser: AddressableLeaser,
    clock: SharedClock,
    default_deadline: chrono::Duration,
}

impl InvocationSystem {
    /// Wire the pipeline together.
    pub fn new(
        serializer: Arc<dyn Serializer>,
        message_handler: MessageHandler,
        execution: ExecutionSystem,
        leaser: AddressableLeaser,
        clock: SharedClock,
        default_deadline: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(InvocationSystemInner {
                serializer,
                message_handler,
                execution,
                leaser,
                clock,
                default_deadline: chrono::Duration::from_std(default_deadline)
                    .unwrap_or_else(|_| chrono::Duration::seconds(30)),
            }),
        }
    }

    /// Issue one outbound invocation and await its completion.
    pub async fn invoke(
        &self,
        target: AddressableReference,
        method: impl Into<String>,
        args: Vec<Value>,
        deadline: Option<Duration>,
    ) -> Result<Value, InvocationError> {
        // The mesh routes by lease; make sure one exists before writing.
        self.inner.leaser.lease_for(&target).await?;

        let payload = self.inner.serializer.encode_args(&args)?;
        let deadline = self.inner.clock.now()
            + deadline
                .and_then(|d| chrono::Duration::from_std(d).ok())
                .unwrap_or(self.inner.default_deadline);

        let reply = self
            .inner
            .message_handler
            .send(OutboundCall {
                target,
                method: method.into(),
                args: payload,
                deadline,
            })
            .await;

        let payload = reply.wait().await?;
        Ok(self.inner.serializer.decode_result(&payload)?)
    }

    /// Serve one inbound invocation request and write its response.
    pub async fn handle_inbound(&self, frame: MessageFrame) {
        let message_id = frame.message_id;
        let MessageContent::InvocationRequest {
            target,
            method,
            args,
            deadline: _,
        } = frame.content
        else {
            warn!(%message_id, "non-request frame on inbound dispatch path");
            return;
        };

        let outcome = match self.inner.serializer.decode_args(&args) {
            Ok(args) => self.inner.execution.dispatch(target, method, args).await,
            Err(error) => Err(InvocationError::Serialization(error)),
        };

        let content = match outcome {
            Ok(value) => match self.inner.serializer.encode_result(&value) {
                Ok(payload) => MessageContent::InvocationResponse { payload },
                Err(error) => failure_content(&InvocationError::Serialization(error)),
            },
            Err(error) => failure_content(&error),
        };

        self.inner
            .message_handler
            .send_frame(MessageFrame {
                message_id,
                content,
            })
            .await;
    }
}

/// Frame an invocation error, preserving the original kind tag for
/// errors raised by the remote actor itself.
fn failure_content(error: &InvocationError) -> MessageContent {
    match error {
        InvocationError::Remote { kind, message } => MessageContent::InvocationFailure {
            kind: kind.clone(),
            message: message.clone(),
        },
        other => MessageContent::InvocationFailure {
            kind: other.wire_kind().to_string(),
            message: other.to_string(),
        },
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_content_passes_actor_kind_through() {
        let error = InvocationError::Remote {
            kind: "quota_exceeded".to_string(),
            message: "limit".to_string(),
        };
        match failure_content(&error) {
            MessageContent::InvocationFailure { kind, message } => {
                assert_eq!(kind, "quota_exceeded");
                assert_eq!(message, "limit");
            }
            other => panic!("unexpected content: {other:?}"),
        }
    }

    #[test]
    fn test_failure_content_tags_runtime_errors() {
        let error = InvocationError::ActivationGone;
        match failure_content(&error) {
            MessageContent::InvocationFailure { kind, .. } => {
                assert_eq!(kind, "activation_gone");
            }
            other => panic!("unexpected content: {other:?}"),
        }
    }
}
