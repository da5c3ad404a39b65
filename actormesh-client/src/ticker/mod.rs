//! The cooperative scheduler driving all periodic work.

pub mod scheduler;

pub use scheduler::{TickFlow, Ticker};
