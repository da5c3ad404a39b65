//! Shared utilities: identifiers and the injectable clock.

pub mod ids;
pub mod time;

pub use ids::{MessageId, MessageSequence, NodeId};
pub use time::{renewal_point, Clock, ManualClock, SharedClock, SystemClock};
