//! Basic Client Example - Hosting and Invoking a Virtual Actor
//!
//! This example runs a complete client lifecycle against the in-process
//! mesh: register an actor interface, join, invoke it through a proxy,
//! and stop cleanly.
//!
//! # What You'll Learn
//!
//! - Implementing the `Addressable` trait for a host actor
//! - Registering an interface and its constructor before `start()`
//! - Invoking a virtual actor through an `ActorProxy`
//! - Observing activation state carried across calls to the same key
//! - Graceful stop with activation drain
//!
//! # Run This Example
//!
//! ```bash
//! cargo run --example greeter_basic
//! ```

use std::sync::Arc;
use std::time::Duration;

use actormesh_client::prelude::*;
use async_trait::async_trait;
use serde_json::{json, Value};

/// Greets by name and remembers how many greetings it has served.
struct Greeter {
    served: u64,
}

#[async_trait]
impl Addressable for Greeter {
    async fn on_activate(&mut self) -> Result<(), ActorError> {
        println!("[greeter] activated");
        Ok(())
    }

    async fn on_invoke(&mut self, method: &str, args: Vec<Value>) -> Result<Value, ActorError> {
        match method {
            "hello" => {
                let name = args.first().and_then(Value::as_str).unwrap_or("?");
                self.served += 1;
                Ok(json!(format!("hi,{name} (#{})", self.served)))
            }
            other => Err(ActorError::new("unknown_method", other)),
        }
    }

    async fn on_deactivate(&mut self) -> Result<(), ActorError> {
        println!("[greeter] deactivated after {} greetings", self.served);
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    println!("=== Greeter Example ===\n");

    // A single-node mesh running inside this process.
    let mesh = InProcessMesh::new();

    let config = ClientConfig::builder()
        .with_namespace("example")
        .with_tick_rate(Duration::from_millis(100))
        .build()?;

    let client = MeshClient::builder()
        .config(config)
        .transport(Arc::new(mesh))
        .build()?;

    client.register_addressable(
        InterfaceId::new("IGreeter"),
        Arc::new(|_reference| Ok(Box::new(Greeter { served: 0 }))),
    )?;

    println!("1. Joining the mesh...");
    client.start().await?;
    println!("   state: {}\n", client.state());

    println!("2. Invoking IGreeter/\"a\"...");
    let greeter = client.proxy(InterfaceId::new("IGreeter"), ActorKey::from("a"));
    for name in ["alice", "bob", "alice"] {
        let reply = greeter.invoke("hello", vec![json!(name)]).await?;
        println!("   hello({name}) -> {reply}");
    }

    println!("\n3. Stopping (drains the activation)...");
    client.stop().await?;
    println!("   state: {}", client.state());

    Ok(())
}
