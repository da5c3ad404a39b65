//! Injectable time source.
//!
//! Every lease expiry, invocation deadline, and idle timestamp in the
//! client is computed from a [`Clock`] rather than from the ambient
//! system time. Production code uses [`SystemClock`]; tests substitute a
//! [`ManualClock`] and advance it deterministically.

// Layer 1: Standard library imports
use std::sync::Arc;
use std::time::Duration;

// Layer 2: Third-party crate imports
use chrono::{DateTime, Utc};
use parking_lot::Mutex;

// Layer 3: Internal module imports
// (none)

/// Shared handle to the configured time source.
pub type SharedClock = Arc<dyn Clock>;

/// Abstract time source.
pub trait Clock: Send + Sync + 'static {
    /// Current instant as a UTC timestamp.
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time source used outside of tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually advanced time source for deterministic tests.
///
/// # Example
/// ```rust
/// use std::time::Duration;
/// use actormesh_client::util::{Clock, ManualClock};
///
/// let clock = ManualClock::starting_now();
/// let before = clock.now();
/// clock.advance(Duration::from_secs(30));
/// assert_eq!(clock.now() - before, chrono::Duration::seconds(30));
/// ```
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    /// Create a manual clock pinned at `start`.
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    /// Create a manual clock pinned at the current wall-clock time.
    pub fn starting_now() -> Self {
        Self::new(Utc::now())
    }

    /// Move the clock forward by `delta`.
    pub fn advance(&self, delta: Duration) {
        let mut now = self.now.lock();
        *now += chrono::Duration::from_std(delta).unwrap_or_else(|_| chrono::Duration::zero());
    }

    /// Pin the clock to an absolute instant.
    pub fn set(&self, instant: DateTime<Utc>) {
        *self.now.lock() = instant;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

/// The instant at which a lease granted now should be renewed.
///
/// Takes the earlier of the mesh's renewal hint and the margin-derived
/// point: with `margin` 0.5, renew once half the lease duration remains.
pub fn renewal_point(
    now: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    hint: DateTime<Utc>,
    margin: f64,
) -> DateTime<Utc> {
    let total_ms = (expires_at - now).num_milliseconds().max(0) as f64;
    let margin_point =
        expires_at - chrono::Duration::milliseconds((total_ms * margin.clamp(0.0, 1.0)) as i64);
    hint.min(margin_point)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_clock_progresses() {
        let clock = SystemClock;
        let a = clock.now();
        let b = clock.now();
        assert!(b >= a);
    }

    #[test]
    fn test_manual_clock_is_frozen() {
        let clock = ManualClock::starting_now();
        assert_eq!(clock.now(), clock.now());
    }

    #[test]
    fn test_manual_clock_advance() {
        let clock = ManualClock::starting_now();
        let start = clock.now();
        clock.advance(Duration::from_millis(1500));
        assert_eq!(clock.now() - start, chrono::Duration::milliseconds(1500));
    }

    #[test]
    fn test_manual_clock_set() {
        let clock = ManualClock::starting_now();
        let target = clock.now() + chrono::Duration::days(1);
        clock.set(target);
        assert_eq!(clock.now(), target);
    }

    #[test]
    fn test_renewal_point_uses_earlier_of_hint_and_margin() {
        let now = Utc::now();
        let expires = now + chrono::Duration::seconds(60);

        // Late hint: the 50% margin point (t+30s) wins.
        let late_hint = now + chrono::Duration::seconds(55);
        assert_eq!(
            renewal_point(now, expires, late_hint, 0.5),
            now + chrono::Duration::seconds(30)
        );

        // Early hint wins over the margin point.
        let early_hint = now + chrono::Duration::seconds(10);
        assert_eq!(renewal_point(now, expires, early_hint, 0.5), early_hint);
    }
}
