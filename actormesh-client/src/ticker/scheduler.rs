//! Fixed-rate tick loop.
//!
//! One tick runs at a time. The composite tick function is awaited to
//! completion before the next boundary is considered; an overrunning
//! tick makes the next one start immediately rather than stack. A
//! panicking tick is caught and logged. Only an explicit
//! [`TickFlow::Stop`] (or [`Ticker::stop`]) ends the loop.

// Layer 1: Standard library imports
use std::panic::AssertUnwindSafe;
use std::time::Duration;

// Layer 2: Third-party crate imports
use futures::future::BoxFuture;
use futures::FutureExt;
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::error;

// Layer 3: Internal module imports
// (none)

/// What the composite tick tells the ticker to do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickFlow {
    /// Keep ticking.
    Continue,
    /// End the loop; the orchestrator is taking the client down.
    Stop,
}

/// Single cooperative scheduler.
pub struct Ticker {
    stop_tx: watch::Sender<bool>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl Ticker {
    /// Spawn the tick loop at `tick_rate`.
    pub fn start<F>(tick_rate: Duration, mut work: F) -> Self
    where
        F: FnMut() -> BoxFuture<'static, TickFlow> + Send + 'static,
    {
        let (stop_tx, mut stop_rx) = watch::channel(false);
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(tick_rate);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    biased;
                    _ = stop_rx.changed() => break,
                    _ = interval.tick() => {
                        match AssertUnwindSafe(work()).catch_unwind().await {
                            Ok(TickFlow::Continue) => {}
                            Ok(TickFlow::Stop) => break,
                            Err(_) => error!("tick panicked, continuing"),
                        }
                    }
                }
            }
        });
        Self {
            stop_tx,
            handle: Mutex::new(Some(handle)),
        }
    }

    /// Signal the loop and wait for the in-flight tick (if any) to
    /// finish. Idempotent.
    pub async fn stop(&self) {
        let _ = self.stop_tx.send(true);
        let handle = self.handle.lock().take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_ticks_fire_repeatedly() {
        let count = Arc::new(AtomicUsize::new(0));
        let counted = Arc::clone(&count);
        let ticker = Ticker::start(Duration::from_millis(10), move || {
            let counted = Arc::clone(&counted);
            Box::pin(async move {
                counted.fetch_add(1, Ordering::SeqCst);
                TickFlow::Continue
            })
        });

        tokio::time::sleep(Duration::from_millis(100)).await;
        ticker.stop().await;
        assert!(count.load(Ordering::SeqCst) >= 3);
    }

    #[tokio::test]
    async fn test_stop_flow_ends_loop() {
        let count = Arc::new(AtomicUsize::new(0));
        let counted = Arc::clone(&count);
        let ticker = Ticker::start(Duration::from_millis(5), move || {
            let counted = Arc::clone(&counted);
            Box::pin(async move {
                counted.fetch_add(1, Ordering::SeqCst);
                TickFlow::Stop
            })
        });

        tokio::time::sleep(Duration::from_millis(60)).await;
        // Loop ended after the first tick despite no stop() call.
        assert_eq!(count.load(Ordering::SeqCst), 1);
        ticker.stop().await;
    }

    #[tokio::test]
    async fn test_at_most_one_tick_in_flight() {
        let in_flight = Arc::new(AtomicUsize::new(0));
        let overlapped = Arc::new(AtomicUsize::new(0));
        let (in_flight_tick, overlapped_tick) = (Arc::clone(&in_flight), Arc::clone(&overlapped));

        // Each tick outruns the 5ms cadence; overlap would be observable.
        let ticker = Ticker::start(Duration::from_millis(5), move || {
            let in_flight = Arc::clone(&in_flight_tick);
            let overlapped = Arc::clone(&overlapped_tick);
            Box::pin(async move {
                if in_flight.fetch_add(1, Ordering::SeqCst) > 0 {
                    overlapped.fetch_add(1, Ordering::SeqCst);
                }
                tokio::time::sleep(Duration::from_millis(20)).await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
                TickFlow::Continue
            })
        });

        tokio::time::sleep(Duration::from_millis(150)).await;
        ticker.stop().await;
        assert_eq!(overlapped.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_panicking_tick_is_survived() {
        let count = Arc::new(AtomicUsize::new(0));
        let counted = Arc::clone(&count);
        let ticker = Ticker::start(Duration::from_millis(5), move || {
            let counted = Arc::clone(&counted);
            Box::pin(async move {
                let seen = counted.fetch_add(1, Ordering::SeqCst);
                assert!(seen != 0, "first tick fails");
                TickFlow::Continue
            })
        });

        tokio::time::sleep(Duration::from_millis(60)).await;
        ticker.stop().await;
        // Ticks kept coming after the panic.
        assert!(count.load(Ordering::SeqCst) >= 3);
    }

    #[tokio::test]
    async fn test_stop_is_idempotent() {
        let ticker = Ticker::start(Duration::from_millis(10), || {
            Box::pin(async { TickFlow::Continue })
        });
        ticker.stop().await;
        ticker.stop().await;
    }
}
