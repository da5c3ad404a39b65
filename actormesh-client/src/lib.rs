//! # actormesh-client - Virtual-Actor Mesh Client Runtime
//!
//! The client-side runtime of a virtual-actor mesh. A process embedding
//! this crate joins a cluster of peer nodes coordinated by a central
//! directory: it advertises the actor interfaces it can host, leases a
//! node identity, serves inbound actor invocations routed to it, and
//! issues outbound invocations through proxies that reach whichever
//! node currently hosts the target actor.
//!
//! Actors are *virtual*: callers address them by stable identity
//! (interface + key), the mesh activates an instance somewhere on
//! demand, and idle instances are deactivated later. Locally the
//! runtime is both server (hosting activations) and client (routing
//! calls out).
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use actormesh_client::prelude::*;
//! use async_trait::async_trait;
//! use serde_json::{json, Value};
//!
//! struct Greeter;
//!
//! #[async_trait]
//! impl Addressable for Greeter {
//!     async fn on_invoke(&mut self, method: &str, args: Vec<Value>) -> Result<Value, ActorError> {
//!         match method {
//!             "hello" => {
//!                 let name = args.first().and_then(Value::as_str).unwrap_or("?");
//!                 Ok(json!(format!("hi,{name}")))
//!             }
//!             other => Err(ActorError::new("unknown_method", other)),
//!         }
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = MeshClient::builder()
//!         .transport(my_transport())
//!         .build()?;
//!
//!     client.register_addressable(
//!         InterfaceId::new("IGreeter"),
//!         Arc::new(|_reference| Ok(Box::new(Greeter))),
//!     )?;
//!
//!     client.start().await?;
//!
//!     let greeter = client.proxy(InterfaceId::new("IGreeter"), ActorKey::from("a"));
//!     let reply = greeter.invoke("hello", vec![json!("x")]).await?;
//!     assert_eq!(reply, json!("hi,x"));
//!
//!     client.stop().await?;
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! Startup is linear: scan capabilities, advertise, join the cluster,
//! open the message stream, then start the single cooperative ticker.
//! Each tick fans out in a fixed order:
//!
//! ```text
//! Ticker -> Connection.tick      (stream liveness, reconnect)
//!        -> NodeLeaser.tick      (membership lease renewal)
//!        -> MessageHandler.tick  (outbound call timeouts)
//!        -> ExecutionSystem.tick (idle/lease deactivation sweep)
//! ```
//!
//! An outbound call flows proxy → invocation system → message handler
//! (correlated) → transport; inbound flows transport → message handler
//! demultiplex → invocation system → per-actor mailbox → actor, with
//! the result returning on the same correlation id.
//!
//! # Guarantees
//!
//! - **Per-actor serialization**: one activation processes one message
//!   at a time, in enqueue order, even across the worker pool.
//! - **Exactly-once completion**: every outbound call is completed by
//!   exactly one of response, remote error, timeout, or disconnect.
//! - **Single timeline**: at most one tick runs at a time; a failed
//!   tick is logged and survived, and only node-lease loss is fatal.
//! - **Clean drain**: `stop()` deactivates every activation (bounded by
//!   the stop deadline) and fails every pending call before returning.
//!
//! # Module Organization
//!
//! - [`client`] - Configuration and the lifecycle orchestrator
//! - [`node`] - Node status under single-writer discipline
//! - [`capability`] - Interface registration and the definition directory
//! - [`lease`] - Node membership and per-actor routing leases
//! - [`connection`] - Message-stream lifecycle and reconnect
//! - [`message`] - Outbound correlation table
//! - [`invocation`] - Encode/decode pipeline and actor proxies
//! - [`execution`] - Activation registry, mailboxes, deactivation sweep
//! - [`ticker`] - The cooperative scheduler
//! - [`wire`] - Frame types, the transport trait, and an in-process mesh
//! - [`serializer`] - Payload serializer boundary
//! - [`addressable`] - Actor identity, leases, and the host actor trait
//! - [`util`] - Ids and the injectable clock

pub mod addressable;
pub mod capability;
pub mod client;
pub mod connection;
pub mod execution;
pub mod invocation;
pub mod lease;
pub mod message;
pub mod node;
pub mod prelude;
pub mod serializer;
pub mod ticker;
pub mod util;
pub mod wire;

// Re-export commonly used types
pub use addressable::{
    ActorError, ActorKey, Addressable, AddressableConstructor, AddressableLease,
    AddressableReference, Deactivator, InterfaceId,
};
pub use client::{ClientConfig, ClientError, MeshClient, MeshClientBuilder, NodeLeaseLostHandler};
pub use invocation::{ActorProxy, InvocationError};
pub use node::{ClientState, NodeInfo, NodeStatus};
pub use serializer::{JsonSerializer, SerializationError, Serializer};
pub use util::{Clock, ManualClock, MessageId, NodeId, SystemClock};
pub use wire::{InProcessMesh, MeshTransport, TransportError};
