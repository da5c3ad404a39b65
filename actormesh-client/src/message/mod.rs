//! Outbound correlation and inbound response demultiplexing.

pub mod handler;

pub use handler::{MessageHandler, OutboundCall, PendingReply};
