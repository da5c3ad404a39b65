// Layer 1: Standard library imports
use std::collections::BTreeSet;
use std::fmt::{self, Display};

// Layer 2: Third-party crate imports
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// Layer 3: Internal module imports
use crate::addressable::InterfaceId;
use crate::util::NodeId;

/// Lifecycle state of the client within the mesh.
///
/// Transitions are monotone over one client instance:
///
/// ```text
/// Idle -> Connecting -> Connected -> Stopping -> Stopped
///             |
///             +--> Idle        (join failure)
/// ```
///
/// A stopped client is never restarted; re-entry requires a new instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClientState {
    /// Constructed, not yet started.
    Idle,
    /// Startup in progress: scanning, joining, connecting.
    Connecting,
    /// Member of the mesh with a live lease and stream.
    Connected,
    /// Graceful teardown in progress.
    Stopping,
    /// Fully torn down; terminal.
    Stopped,
}

impl ClientState {
    /// Whether `next` is a legal successor of this state.
    pub fn can_transition_to(self, next: ClientState) -> bool {
        matches!(
            (self, next),
            (ClientState::Idle, ClientState::Connecting)
                | (ClientState::Connecting, ClientState::Connected)
                | (ClientState::Connecting, ClientState::Idle)
                | (ClientState::Connected, ClientState::Stopping)
                | (ClientState::Stopping, ClientState::Stopped)
        )
    }
}

impl Display for ClientState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Stopping => "stopping",
            Self::Stopped => "stopped",
        };
        write!(f, "{name}")
    }
}

/// Mesh-assigned identity and node-lease terms, present once joined.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeInfo {
    /// Identity assigned at join.
    pub id: NodeId,
    /// Hard bound on mesh membership without a renewal.
    pub lease_expires_at: DateTime<Utc>,
    /// First instant at which the lease should be renewed.
    pub lease_renew_at: DateTime<Utc>,
}

/// Immutable snapshot of node-level state.
///
/// Only [`LocalNode`](super::LocalNode) mutates this; everyone else works
/// from snapshots that are internally consistent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeStatus {
    /// Identity and lease terms; `None` before a successful join.
    pub node_info: Option<NodeInfo>,
    /// Interfaces this node advertises as hostable.
    pub capabilities: BTreeSet<InterfaceId>,
    /// Current lifecycle state.
    pub client_state: ClientState,
}

impl Default for NodeStatus {
    fn default() -> Self {
        Self {
            node_info: None,
            capabilities: BTreeSet::new(),
            client_state: ClientState::Idle,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_status_is_idle_and_empty() {
        let status = NodeStatus::default();
        assert_eq!(status.client_state, ClientState::Idle);
        assert!(status.node_info.is_none());
        assert!(status.capabilities.is_empty());
    }

    #[test]
    fn test_forward_transitions_are_legal() {
        use ClientState::*;
        assert!(Idle.can_transition_to(Connecting));
        assert!(Connecting.can_transition_to(Connected));
        assert!(Connected.can_transition_to(Stopping));
        assert!(Stopping.can_transition_to(Stopped));
    }

    #[test]
    fn test_join_failure_shortcut_is_legal() {
        assert!(ClientState::Connecting.can_transition_to(ClientState::Idle));
    }

    #[test]
    fn test_backward_and_skip_transitions_are_illegal() {
        use ClientState::*;
        assert!(!Connected.can_transition_to(Connecting));
        assert!(!Idle.can_transition_to(Connected));
        assert!(!Stopped.can_transition_to(Idle));
        assert!(!Stopped.can_transition_to(Connecting));
        assert!(!Connecting.can_transition_to(Stopping));
    }

    #[test]
    fn test_state_display() {
        assert_eq!(ClientState::Connected.to_string(), "connected");
        assert_eq!(ClientState::Stopping.to_string(), "stopping");
    }
}
