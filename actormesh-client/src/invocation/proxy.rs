// Layer 1: Standard library imports
use std::time::Duration;

// Layer 2: Third-party crate imports
use serde_json::Value;

// Layer 3: Internal module imports
use super::error::InvocationError;
use super::system::InvocationSystem;
use crate::addressable::AddressableReference;

/// Handle for invoking one virtual actor.
///
/// Cheap to clone and safe to share; the mesh decides where the actor
/// lives. Hosts typically wrap proxies in typed helpers:
///
/// ```rust,ignore
/// struct Greeter(ActorProxy);
///
/// impl Greeter {
///     async fn hello(&self, name: &str) -> Result<String, InvocationError> {
///         let value = self.0.invoke("hello", vec![json!(name)]).await?;
///         Ok(value.as_str().unwrap_or_default().to_owned())
///     }
/// }
/// ```
#[derive(Clone)]
pub struct ActorProxy {
    reference: AddressableReference,
    invocations: InvocationSystem,
}

impl ActorProxy {
    pub(crate) fn new(reference: AddressableReference, invocations: InvocationSystem) -> Self {
        Self {
            reference,
            invocations,
        }
    }

    /// The actor this proxy addresses.
    pub fn reference(&self) -> &AddressableReference {
        &self.reference
    }

    /// Invoke with the client's default deadline.
    pub async fn invoke(
        &self,
        method: impl Into<String>,
        args: Vec<Value>,
    ) -> Result<Value, InvocationError> {
        self.invocations
            .invoke(self.reference.clone(), method, args, None)
            .await
    }

    /// Invoke with an explicit deadline.
    pub async fn invoke_with_deadline(
        &self,
        method: impl Into<String>,
        args: Vec<Value>,
        deadline: Duration,
    ) -> Result<Value, InvocationError> {
        self.invocations
            .invoke(self.reference.clone(), method, args, Some(deadline))
            .await
    }
}
