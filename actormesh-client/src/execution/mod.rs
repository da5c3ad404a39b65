//! Activation registry, per-actor mailboxes, and the deactivation sweep.

pub mod activation;
pub mod leases;
pub mod system;

pub use activation::{Activation, ActivationState};
pub use leases::ExecutionLeases;
pub use system::ExecutionSystem;
