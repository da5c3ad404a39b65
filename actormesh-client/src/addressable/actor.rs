//! The trait host-provided actors implement, and the callable types the
//! host supplies for constructing and tearing down activations.

// Layer 1: Standard library imports
use std::fmt;
use std::sync::Arc;

// Layer 2: Third-party crate imports
use async_trait::async_trait;
use futures::future::BoxFuture;
use serde_json::Value;

// Layer 3: Internal module imports
use super::reference::AddressableReference;

/// Error raised by host actor code.
///
/// Carries a stable `kind` tag alongside the human-readable message; the
/// tag survives the wire round trip so the caller can branch on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActorError {
    /// Stable machine-readable tag, e.g. `"not_found"`.
    pub kind: String,
    /// Human-readable description.
    pub message: String,
}

impl ActorError {
    /// Build an error with an explicit kind tag.
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
        }
    }

    /// Build an error with the generic `"application"` kind.
    pub fn application(message: impl Into<String>) -> Self {
        Self::new("application", message)
    }
}

impl fmt::Display for ActorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.kind, self.message)
    }
}

impl std::error::Error for ActorError {}

/// A host-provided virtual actor implementation.
///
/// One instance exists per activation; the execution system guarantees
/// `on_invoke` is never entered concurrently for the same instance, so
/// implementations hold plain mutable state.
///
/// # Example
///
/// ```rust
/// use actormesh_client::addressable::{ActorError, Addressable};
/// use async_trait::async_trait;
/// use serde_json::{json, Value};
///
/// struct Greeter;
///
/// #[async_trait]
/// impl Addressable for Greeter {
///     async fn on_invoke(&mut self, method: &str, args: Vec<Value>) -> Result<Value, ActorError> {
///         match method {
///             "hello" => {
///                 let name = args
///                     .first()
///                     .and_then(Value::as_str)
///                     .ok_or_else(|| ActorError::application("missing name"))?;
///                 Ok(json!(format!("hi,{name}")))
///             }
///             other => Err(ActorError::new("unknown_method", other)),
///         }
///     }
/// }
/// ```
#[async_trait]
pub trait Addressable: Send + 'static {
    /// Lifecycle hook run once after construction, before the first
    /// message. Failure aborts the activation.
    async fn on_activate(&mut self) -> Result<(), ActorError> {
        Ok(())
    }

    /// Handle one invocation. Calls for the same activation are strictly
    /// serialized in enqueue order.
    async fn on_invoke(&mut self, method: &str, args: Vec<Value>) -> Result<Value, ActorError>;

    /// Lifecycle hook run during deactivation, after the mailbox has
    /// drained. Errors are logged, not propagated.
    async fn on_deactivate(&mut self) -> Result<(), ActorError> {
        Ok(())
    }
}

/// Host factory producing an actor instance for a reference.
pub type AddressableConstructor =
    Arc<dyn Fn(&AddressableReference) -> Result<Box<dyn Addressable>, ActorError> + Send + Sync>;

/// Host callback invoked while an activation is being torn down; may
/// perform async cleanup beyond the instance's own `on_deactivate`.
pub type Deactivator = Arc<dyn Fn(AddressableReference) -> BoxFuture<'static, ()> + Send + Sync>;
