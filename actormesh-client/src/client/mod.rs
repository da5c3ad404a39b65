//! Top-level client: configuration and the lifecycle orchestrator.

pub mod client;
pub mod config;
pub mod error;

pub use client::{MeshClient, MeshClientBuilder, NodeLeaseLostHandler};
pub use config::{ClientConfig, ClientConfigBuilder};
pub use error::ClientError;
