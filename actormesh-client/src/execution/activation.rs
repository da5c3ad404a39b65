//! One in-process activation of a virtual actor.

// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

// Layer 3: Internal module imports
use crate::addressable::AddressableReference;
use crate::invocation::error::InvocationError;

/// Lifecycle of an activation.
///
/// ```text
/// Activating --construct ok--> Active --idle/stop--> Deactivating --> Deactivated
///      |                                                                  ^
///      +-- construct fail -------------------------------------------------+
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationState {
    /// Constructor and `on_activate` running; messages queue up.
    Activating,
    /// Serving messages.
    Active,
    /// Mailbox closed, draining remaining messages.
    Deactivating,
    /// Terminal; the registry entry is gone or going.
    Deactivated,
}

/// One unit of work for an activation's mailbox.
pub(crate) struct InvocationJob {
    pub method: String,
    pub args: Vec<Value>,
    pub reply: oneshot::Sender<Result<Value, InvocationError>>,
}

/// Registry entry for one activated actor.
///
/// The mailbox task processes jobs strictly one at a time, which is the
/// per-actor serialization guarantee callers depend on. At most one
/// in-flight message exists per activation.
pub struct Activation {
    reference: AddressableReference,
    state: Mutex<ActivationState>,
    last_touched: Mutex<DateTime<Utc>>,
    mailbox: Mutex<Option<mpsc::UnboundedSender<InvocationJob>>>,
    task: Mutex<Option<JoinHandle<()>>>,
    failure: Mutex<Option<String>>,
}

impl Activation {
    pub(crate) fn new(
        reference: AddressableReference,
        mailbox: mpsc::UnboundedSender<InvocationJob>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            reference,
            state: Mutex::new(ActivationState::Activating),
            last_touched: Mutex::new(now),
            mailbox: Mutex::new(Some(mailbox)),
            task: Mutex::new(None),
            failure: Mutex::new(None),
        }
    }

    /// The actor this activation embodies.
    pub fn reference(&self) -> &AddressableReference {
        &self.reference
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ActivationState {
        *self.state.lock()
    }

    pub(crate) fn set_state(&self, state: ActivationState) {
        *self.state.lock() = state;
    }

    /// Instant of the most recent enqueue or completion.
    pub fn last_touched(&self) -> DateTime<Utc> {
        *self.last_touched.lock()
    }

    pub(crate) fn touch(&self, now: DateTime<Utc>) {
        *self.last_touched.lock() = now;
    }

    pub(crate) fn attach_task(&self, task: JoinHandle<()>) {
        *self.task.lock() = Some(task);
    }

    pub(crate) fn take_task(&self) -> Option<JoinHandle<()>> {
        self.task.lock().take()
    }

    /// Enqueue a job if the mailbox is still accepting.
    pub(crate) fn enqueue(&self, job: InvocationJob) -> Result<(), InvocationError> {
        let guard = self.mailbox.lock();
        match guard.as_ref() {
            Some(sender) => sender.send(job).map_err(|_| InvocationError::ActivationGone),
            None => Err(InvocationError::ActivationGone),
        }
    }

    /// Close the mailbox: queued jobs drain, new jobs are rejected with
    /// `ActivationGone`.
    pub(crate) fn close_mailbox(&self) {
        self.mailbox.lock().take();
    }

    /// Record why construction failed, so late enqueuers see the real
    /// error rather than a bare `ActivationGone`.
    pub(crate) fn record_failure(&self, message: String) {
        *self.failure.lock() = Some(message);
    }

    pub(crate) fn failure(&self) -> Option<String> {
        self.failure.lock().clone()
    }
}
