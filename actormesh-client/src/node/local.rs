//! The single mutation point for node-level state.

// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
use parking_lot::Mutex;
use tracing::debug;

// Layer 3: Internal module imports
use super::status::{ClientState, NodeStatus};

/// Owner of the mutable [`NodeStatus`].
///
/// All mutation flows through [`manipulate`](Self::manipulate), which is
/// serialized by a short critical section; readers get atomic snapshots.
/// The transformation passed to `manipulate` runs under the lock and
/// must not block or suspend.
#[derive(Debug, Default)]
pub struct LocalNode {
    status: Mutex<NodeStatus>,
}

impl LocalNode {
    /// Create a node in the [`ClientState::Idle`] state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomic snapshot of the current status.
    pub fn snapshot(&self) -> NodeStatus {
        self.status.lock().clone()
    }

    /// Apply a pure transformation to the status, serialized with all
    /// other mutations. Returns the status as written.
    pub fn manipulate<F>(&self, f: F) -> NodeStatus
    where
        F: FnOnce(NodeStatus) -> NodeStatus,
    {
        let mut guard = self.status.lock();
        let before = guard.client_state;
        *guard = f(guard.clone());
        if guard.client_state != before {
            debug!(from = %before, to = %guard.client_state, "client state transition");
        }
        guard.clone()
    }

    /// Transition to `next` if legal from the current state.
    ///
    /// Returns `true` when the transition was applied. Used by the
    /// orchestrator to make lifecycle races (double start, concurrent
    /// stop) lose cleanly instead of corrupting the state machine.
    pub fn try_transition(&self, next: ClientState) -> bool {
        let mut guard = self.status.lock();
        if guard.client_state.can_transition_to(next) {
            debug!(from = %guard.client_state, to = %next, "client state transition");
            guard.client_state = next;
            true
        } else {
            false
        }
    }

    /// Convenience reader for just the lifecycle state.
    pub fn client_state(&self) -> ClientState {
        self.status.lock().client_state
    }

    /// Return to [`ClientState::Idle`] with no capabilities and no
    /// node info.
    pub fn reset(&self) {
        *self.status.lock() = NodeStatus::default();
    }
}
