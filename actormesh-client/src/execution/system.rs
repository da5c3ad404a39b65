//! Activation registry and lifecycle engine.

// Layer 1: Standard library imports
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

// Layer 2: Third-party crate imports
use dashmap::DashMap;
use parking_lot::RwLock;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot, Semaphore};
use tracing::{debug, warn};

// Layer 3: Internal module imports
use super::activation::{Activation, ActivationState, InvocationJob};
use super::leases::ExecutionLeases;
use crate::addressable::{
    ActorError, AddressableConstructor, AddressableReference, Deactivator,
};
use crate::capability::DefinitionDirectory;
use crate::invocation::error::InvocationError;
use crate::util::SharedClock;

/// Hosts activations: creates them on demand, dispatches inbound
/// invocations through per-actor mailboxes, and sweeps idle or
/// lease-lost activations on each tick.
///
/// Invocations run on a worker pool bounded by the configured width, but
/// a single activation is dispatched to at most one worker at a time.
/// The mailbox task is the serialization point.
#[derive(Clone)]
pub struct ExecutionSystem {
    inner: Arc<ExecutionSystemInner>,
}

struct ExecutionSystemInner {
    directory: Arc<DefinitionDirectory>,
    leases: ExecutionLeases,
    clock: SharedClock,
    pool: Arc<Semaphore>,
    idle_timeout: chrono::Duration,
    deactivator: Arc<RwLock<Option<Deactivator>>>,
    activations: Arc<DashMap<AddressableReference, Arc<Activation>>>,
    stopping: AtomicBool,
    deactivated: Arc<AtomicU64>,
}

impl ExecutionSystem {
    /// Create an execution system.
    ///
    /// `pool` bounds how many actor invocations run concurrently across
    /// all activations; `idle_timeout` is the addressable TTL after
    /// which an untouched activation is swept.
    pub fn new(
        directory: Arc<DefinitionDirectory>,
        leases: ExecutionLeases,
        clock: SharedClock,
        pool: usize,
        idle_timeout: Duration,
        deactivator: Option<Deactivator>,
    ) -> Self {
        Self {
            inner: Arc::new(ExecutionSystemInner {
                directory,
                leases,
                clock,
                pool: Arc::new(Semaphore::new(pool.max(1))),
                idle_timeout: chrono::Duration::from_std(idle_timeout)
                    .unwrap_or_else(|_| chrono::Duration::seconds(600)),
                deactivator: Arc::new(RwLock::new(deactivator)),
                activations: Arc::new(DashMap::new()),
                stopping: AtomicBool::new(false),
                deactivated: Arc::new(AtomicU64::new(0)),
            }),
        }
    }

    /// Route one inbound invocation onto its activation, creating the
    /// activation if the interface is hostable here. Resolves when the
    /// actor has produced a result or the activation path failed.
    pub async fn dispatch(
        &self,
        reference: AddressableReference,
        method: String,
        args: Vec<Value>,
    ) -> Result<Value, InvocationError> {
        if self.inner.stopping.load(Ordering::SeqCst) {
            return Err(InvocationError::ActivationGone);
        }

        let activation = match self.inner.activations.get(&reference) {
            Some(existing) => Arc::clone(&existing),
            None => {
                let constructor = self
                    .inner
                    .directory
                    .lookup(&reference.interface)
                    .map_err(|error| InvocationError::ActivationFailed(error.to_string()))?;
                let entry = self
                    .inner
                    .activations
                    .entry(reference.clone())
                    .or_insert_with(|| self.spawn_activation(reference.clone(), constructor));
                Arc::clone(&entry)
            }
        };

        let (reply_tx, reply_rx) = oneshot::channel();
        if let Err(gone) = activation.enqueue(InvocationJob {
            method,
            args,
            reply: reply_tx,
        }) {
            return Err(rejection(&activation, gone));
        }
        activation.touch(self.inner.clock.now());

        match reply_rx.await {
            Ok(outcome) => outcome,
            Err(_) => Err(rejection(&activation, InvocationError::ActivationGone)),
        }
    }

    /// Deactivation sweep.
    ///
    /// An active activation is taken down when it has been idle past the
    /// TTL, or when the lease backing it can no longer be renewed.
    pub async fn tick(&self) {
        if self.inner.stopping.load(Ordering::SeqCst) {
            return;
        }

        let now = self.inner.clock.now();
        let candidates: Vec<Arc<Activation>> = self
            .inner
            .activations
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();

        for activation in candidates {
            if activation.state() != ActivationState::Active {
                continue;
            }

            let idle =
                now.signed_duration_since(activation.last_touched()) >= self.inner.idle_timeout;
            let lease_lost = if idle {
                false
            } else {
                match self.inner.leases.ensure_current(activation.reference()).await {
                    Ok(_) => false,
                    Err(error) => {
                        warn!(reference = %activation.reference(), %error, "execution lease lost");
                        true
                    }
                }
            };

            if idle || lease_lost {
                debug!(reference = %activation.reference(), idle, "sweeping activation");
                self.begin_deactivation(&activation);
            }
        }
    }

    /// Drain every activation.
    ///
    /// Returns once all activations reach `Deactivated` or `deadline`
    /// elapses; stragglers past the deadline are abandoned and logged.
    /// New dispatches are rejected with `ActivationGone` from the moment
    /// this is called.
    pub async fn stop(&self, deactivator: Option<Deactivator>, deadline: Duration) {
        self.inner.stopping.store(true, Ordering::SeqCst);
        if let Some(deactivator) = deactivator {
            *self.inner.deactivator.write() = Some(deactivator);
        }

        let draining: Vec<Arc<Activation>> = self
            .inner
            .activations
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();

        let mut handles = Vec::new();
        for activation in &draining {
            self.begin_deactivation(activation);
            if let Some(handle) = activation.take_task() {
                handles.push(handle);
            }
        }

        let drained = tokio::time::timeout(deadline, futures::future::join_all(handles)).await;
        if drained.is_err() {
            for activation in &draining {
                if activation.state() != ActivationState::Deactivated {
                    warn!(reference = %activation.reference(), "abandoning activation at stop deadline");
                }
            }
        }
        self.inner.activations.clear();
    }

    /// Number of live registry entries.
    pub fn activation_count(&self) -> usize {
        self.inner.activations.len()
    }

    /// Activations that completed deactivation over this system's life.
    pub fn deactivated_count(&self) -> u64 {
        self.inner.deactivated.load(Ordering::Relaxed)
    }

    fn begin_deactivation(&self, activation: &Arc<Activation>) {
        activation.set_state(ActivationState::Deactivating);
        activation.close_mailbox();
        self.inner
            .activations
            .remove_if(activation.reference(), |_, entry| {
                Arc::ptr_eq(entry, activation)
            });
    }

    fn spawn_activation(
        &self,
        reference: AddressableReference,
        constructor: AddressableConstructor,
    ) -> Arc<Activation> {
        let (mailbox_tx, mailbox_rx) = mpsc::unbounded_channel();
        let activation = Arc::new(Activation::new(
            reference.clone(),
            mailbox_tx,
            self.inner.clock.now(),
        ));

        let task = tokio::spawn(run_activation(
            Arc::clone(&activation),
            constructor,
            mailbox_rx,
            Arc::clone(&self.inner.pool),
            Arc::clone(&self.inner.clock),
            Arc::clone(&self.inner.deactivator),
            self.inner.leases.clone(),
            Arc::clone(&self.inner.activations),
            Arc::clone(&self.inner.deactivated),
        ));
        activation.attach_task(task);
        activation
    }
}

/// Mailbox loop for one activation: construct, serve serially, drain,
/// tear down.
#[allow(clippy::too_many_arguments)]
async fn run_activation(
    activation: Arc<Activation>,
    constructor: AddressableConstructor,
    mut mailbox: mpsc::UnboundedReceiver<InvocationJob>,
    pool: Arc<Semaphore>,
    clock: SharedClock,
    deactivator: Arc<RwLock<Option<Deactivator>>>,
    leases: ExecutionLeases,
    registry: Arc<DashMap<AddressableReference, Arc<Activation>>>,
    deactivated: Arc<AtomicU64>,
) {
    let reference = activation.reference().clone();

    let mut instance = match constructor(&reference) {
        Ok(instance) => instance,
        Err(error) => {
            fail_activation(&activation, mailbox, &registry, error).await;
            return;
        }
    };
    if let Err(error) = instance.on_activate().await {
        fail_activation(&activation, mailbox, &registry, error).await;
        return;
    }
    activation.set_state(ActivationState::Active);
    debug!(%reference, "activation active");

    while let Some(job) = mailbox.recv().await {
        let _permit = pool.acquire().await.ok();
        let outcome = instance
            .on_invoke(&job.method, job.args)
            .await
            .map_err(|error| InvocationError::Remote {
                kind: error.kind,
                message: error.message,
            });
        activation.touch(clock.now());
        let _ = job.reply.send(outcome);
    }

    // Mailbox closed: deactivate.
    activation.set_state(ActivationState::Deactivating);
    if let Err(error) = instance.on_deactivate().await {
        warn!(%reference, %error, "on_deactivate failed");
    }
    let host_deactivator = deactivator.read().clone();
    if let Some(host_deactivator) = host_deactivator {
        host_deactivator(reference.clone()).await;
    }
    leases.release(&reference);
    activation.set_state(ActivationState::Deactivated);
    deactivated.fetch_add(1, Ordering::Relaxed);
    debug!(%reference, "activation deactivated");
}

/// What a caller sees when its job could not be (or was not) served:
/// the recorded construction failure if there is one, else the given
/// gone-error.
fn rejection(activation: &Activation, gone: InvocationError) -> InvocationError {
    match activation.failure() {
        Some(message) => InvocationError::ActivationFailed(message),
        None => gone,
    }
}

/// Construction failed: reject everything queued and vacate the registry.
async fn fail_activation(
    activation: &Arc<Activation>,
    mut mailbox: mpsc::UnboundedReceiver<InvocationJob>,
    registry: &DashMap<AddressableReference, Arc<Activation>>,
    error: ActorError,
) {
    warn!(reference = %activation.reference(), %error, "activation failed");
    activation.record_failure(error.to_string());
    activation.set_state(ActivationState::Deactivated);
    activation.close_mailbox();
    registry.remove_if(activation.reference(), |_, entry| {
        Arc::ptr_eq(entry, activation)
    });
    while let Some(job) = mailbox.recv().await {
        let _ = job
            .reply
            .send(Err(InvocationError::ActivationFailed(error.to_string())));
    }
}
