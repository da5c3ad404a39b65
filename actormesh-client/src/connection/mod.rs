//! Message-stream lifecycle: open after join, pump inbound frames,
//! reconnect on transient loss, tear down on stop.

pub mod handler;

pub use handler::ConnectionHandler;
