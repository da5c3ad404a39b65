//! Node-level state: the client lifecycle enum, the status record, and
//! the single-writer [`LocalNode`] cell that owns both.

pub mod local;
pub mod status;

pub use local::LocalNode;
pub use status::{ClientState, NodeInfo, NodeStatus};
