//! Integration tests for the execution system through the full client:
//! - Per-actor serialization under concurrent load
//! - Idle deactivation after the addressable TTL
//! - Activation failure surfaced to callers

#![allow(clippy::unwrap_used)]
#![allow(clippy::panic)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use actormesh_client::prelude::*;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

/// Records enter/exit events into a shared log, with a suspension in
/// between so interleaving would be visible if serialization broke.
struct Recorder {
    log: Arc<Mutex<Vec<&'static str>>>,
}

#[async_trait]
impl Addressable for Recorder {
    async fn on_invoke(&mut self, _method: &str, _args: Vec<Value>) -> Result<Value, ActorError> {
        self.log.lock().push("enter");
        tokio::time::sleep(Duration::from_millis(1)).await;
        self.log.lock().push("exit");
        Ok(Value::Null)
    }
}

fn fast_config() -> ClientConfig {
    ClientConfig::builder()
        .with_tick_rate(Duration::from_millis(50))
        .with_join_retry(3, Duration::from_millis(50))
        .build()
        .unwrap()
}

// ============================================================================
// Per-actor serialization
// ============================================================================

#[tokio::test(flavor = "multi_thread")]
async fn test_per_actor_serialization_is_strictly_nested() {
    let mesh = InProcessMesh::new();
    let log: Arc<Mutex<Vec<&'static str>>> = Arc::new(Mutex::new(Vec::new()));
    let log_in_ctor = Arc::clone(&log);

    let client = MeshClient::builder()
        .config(fast_config())
        .transport(Arc::new(mesh))
        .build()
        .unwrap();
    client
        .register_addressable(
            InterfaceId::new("IRecorder"),
            Arc::new(move |_| {
                Ok(Box::new(Recorder {
                    log: Arc::clone(&log_in_ctor),
                }))
            }),
        )
        .unwrap();
    client.start().await.unwrap();

    let mut joins = Vec::new();
    for _ in 0..100 {
        let proxy = client.proxy(InterfaceId::new("IRecorder"), ActorKey::from("only"));
        joins.push(tokio::spawn(async move { proxy.invoke("record", vec![]).await }));
    }
    for join in joins {
        join.await.unwrap().unwrap();
    }

    let events = log.lock().clone();
    assert_eq!(events.len(), 200);
    for pair in events.chunks(2) {
        assert_eq!(pair, ["enter", "exit"], "interleaved events: {events:?}");
    }

    client.stop().await.unwrap();
}

// ============================================================================
// Idle deactivation
// ============================================================================

#[tokio::test(flavor = "multi_thread")]
async fn test_idle_activation_is_deactivated_once() {
    let mesh = InProcessMesh::new();
    let deactivations = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&deactivations);

    let config = ClientConfig::builder()
        .with_tick_rate(Duration::from_millis(100))
        .with_join_retry(3, Duration::from_millis(50))
        .with_addressable_ttl(Duration::from_millis(500))
        .build()
        .unwrap();

    let client = MeshClient::builder()
        .config(config)
        .transport(Arc::new(mesh))
        .deactivator(Arc::new(move |_reference| {
            let counter = Arc::clone(&counter);
            Box::pin(async move {
                counter.fetch_add(1, Ordering::SeqCst);
            })
        }))
        .build()
        .unwrap();
    client
        .register_addressable(
            InterfaceId::new("IRecorder"),
            Arc::new(|_| {
                Ok(Box::new(Recorder {
                    log: Arc::new(Mutex::new(Vec::new())),
                }))
            }),
        )
        .unwrap();
    client.start().await.unwrap();

    let proxy = client.proxy(InterfaceId::new("IRecorder"), ActorKey::from("idle"));
    proxy.invoke("record", vec![]).await.unwrap();
    assert_eq!(client.activation_count(), 1);

    // One second with no traffic against a 500ms TTL.
    tokio::time::sleep(Duration::from_secs(1)).await;

    assert_eq!(client.activation_count(), 0);
    assert_eq!(deactivations.load(Ordering::SeqCst), 1);

    client.stop().await.unwrap();
    // Stop does not re-deactivate what the sweep already removed.
    assert_eq!(deactivations.load(Ordering::SeqCst), 1);
}

// ============================================================================
// Activation failure
// ============================================================================

#[tokio::test(flavor = "multi_thread")]
async fn test_construction_failure_surfaces_to_caller() {
    let mesh = InProcessMesh::new();
    let client = MeshClient::builder()
        .config(fast_config())
        .transport(Arc::new(mesh))
        .build()
        .unwrap();
    client
        .register_addressable(
            InterfaceId::new("IBroken"),
            Arc::new(|_| Err(ActorError::application("no dice"))),
        )
        .unwrap();
    client.start().await.unwrap();

    let proxy = client.proxy(InterfaceId::new("IBroken"), ActorKey::from("a"));
    let err = proxy.invoke("anything", vec![]).await.unwrap_err();
    match err {
        InvocationError::Remote { kind, .. } => assert_eq!(kind, "activation_failed"),
        other => panic!("expected activation failure, got {other:?}"),
    }

    client.stop().await.unwrap();
}
