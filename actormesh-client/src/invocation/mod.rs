//! The invocation pipeline: typed calls out, decoded dispatches in.

pub mod error;
pub mod proxy;
pub mod system;

pub use error::InvocationError;
pub use proxy::ActorProxy;
pub use system::InvocationSystem;
