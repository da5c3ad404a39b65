//! Client configuration with sensible defaults.

// Layer 1: Standard library imports
use std::time::Duration;

// Layer 2: Third-party crate imports
use serde::{Deserialize, Serialize};

// Layer 3: Internal module imports
// (none initially)

/// Default logical partition advertised to the mesh.
pub const DEFAULT_NAMESPACE: &str = "default";

/// Default mesh endpoint.
pub const DEFAULT_GRPC_ENDPOINT: &str = "http://localhost:50056";

/// Default spacing between cooperative ticks (1 second).
pub const DEFAULT_TICK_RATE: Duration = Duration::from_secs(1);

/// Default cluster join retry policy: 60 attempts, 1 second apart.
pub const DEFAULT_JOIN_ATTEMPTS: u32 = 60;

/// Default delay between join attempts.
pub const DEFAULT_JOIN_DELAY: Duration = Duration::from_secs(1);

/// Default per-invocation deadline (30 seconds).
pub const DEFAULT_INVOCATION_DEADLINE: Duration = Duration::from_secs(30);

/// Default idle timeout before a host-side activation is swept (10 minutes).
pub const DEFAULT_ADDRESSABLE_TTL: Duration = Duration::from_secs(600);

/// Default lease renewal margin: renew when half the duration remains.
pub const DEFAULT_LEASE_RENEWAL_MARGIN: f64 = 0.5;

/// Default initial reconnect backoff.
pub const DEFAULT_RECONNECT_BACKOFF_INITIAL: Duration = Duration::from_millis(250);

/// Default reconnect backoff ceiling.
pub const DEFAULT_RECONNECT_BACKOFF_MAX: Duration = Duration::from_secs(5);

/// Default bound on the activation drain during stop (30 seconds).
pub const DEFAULT_STOP_DEADLINE: Duration = Duration::from_secs(30);

/// Everything tunable about the client.
///
/// # Examples
///
/// ```rust
/// use std::time::Duration;
/// use actormesh_client::client::ClientConfig;
///
/// let config = ClientConfig::builder()
///     .with_namespace("orders")
///     .with_tick_rate(Duration::from_millis(100))
///     .with_addressable_ttl(Duration::from_secs(60))
///     .build()
///     .unwrap();
/// assert_eq!(config.namespace, "orders");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Logical partition advertised to the mesh.
    pub namespace: String,

    /// Mesh directory address handed to the transport.
    pub grpc_endpoint: String,

    /// Worker pool width for actor dispatch.
    pub pool: usize,

    /// Spacing between cooperative ticks.
    pub tick_rate: Duration,

    /// Cluster join attempts before `start()` fails.
    pub join_attempts: u32,

    /// Delay between join attempts.
    pub join_delay: Duration,

    /// Deadline applied to invocations that do not carry their own.
    pub invocation_deadline: Duration,

    /// Idle timeout for host-side activations.
    pub addressable_ttl: Duration,

    /// Fraction of lease duration remaining at which renewal is due.
    pub lease_renewal_margin: f64,

    /// First reconnect delay after a stream drop.
    pub reconnect_backoff_initial: Duration,

    /// Reconnect delay ceiling.
    pub reconnect_backoff_max: Duration,

    /// Bound on the activation drain during stop.
    pub stop_deadline: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            grpc_endpoint: DEFAULT_GRPC_ENDPOINT.to_string(),
            pool: num_cpus::get(),
            tick_rate: DEFAULT_TICK_RATE,
            join_attempts: DEFAULT_JOIN_ATTEMPTS,
            join_delay: DEFAULT_JOIN_DELAY,
            invocation_deadline: DEFAULT_INVOCATION_DEADLINE,
            addressable_ttl: DEFAULT_ADDRESSABLE_TTL,
            lease_renewal_margin: DEFAULT_LEASE_RENEWAL_MARGIN,
            reconnect_backoff_initial: DEFAULT_RECONNECT_BACKOFF_INITIAL,
            reconnect_backoff_max: DEFAULT_RECONNECT_BACKOFF_MAX,
            stop_deadline: DEFAULT_STOP_DEADLINE,
        }
    }
}

impl ClientConfig {
    /// Create a configuration builder.
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.pool == 0 {
            return Err("pool must be > 0".to_string());
        }
        if self.tick_rate.is_zero() {
            return Err("tick_rate must be > 0".to_string());
        }
        if self.join_attempts == 0 {
            return Err("join_attempts must be > 0".to_string());
        }
        if self.invocation_deadline.is_zero() {
            return Err("invocation_deadline must be > 0".to_string());
        }
        if self.addressable_ttl.is_zero() {
            return Err("addressable_ttl must be > 0".to_string());
        }
        if !(self.lease_renewal_margin > 0.0 && self.lease_renewal_margin <= 1.0) {
            return Err("lease_renewal_margin must be in (0, 1]".to_string());
        }
        if self.stop_deadline.is_zero() {
            return Err("stop_deadline must be > 0".to_string());
        }
        Ok(())
    }
}

/// Builder for [`ClientConfig`] with a fluent API.
#[derive(Debug, Default)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    /// Set the logical partition.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.config.namespace = namespace.into();
        self
    }

    /// Set the mesh directory address.
    pub fn with_grpc_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.config.grpc_endpoint = endpoint.into();
        self
    }

    /// Set the worker pool width.
    pub fn with_pool(mut self, pool: usize) -> Self {
        self.config.pool = pool;
        self
    }

    /// Set the tick spacing.
    pub fn with_tick_rate(mut self, tick_rate: Duration) -> Self {
        self.config.tick_rate = tick_rate;
        self
    }

    /// Set the join retry policy.
    pub fn with_join_retry(mut self, attempts: u32, delay: Duration) -> Self {
        self.config.join_attempts = attempts;
        self.config.join_delay = delay;
        self
    }

    /// Set the default invocation deadline.
    pub fn with_invocation_deadline(mut self, deadline: Duration) -> Self {
        self.config.invocation_deadline = deadline;
        self
    }

    /// Set the activation idle timeout.
    pub fn with_addressable_ttl(mut self, ttl: Duration) -> Self {
        self.config.addressable_ttl = ttl;
        self
    }

    /// Set the lease renewal margin.
    pub fn with_lease_renewal_margin(mut self, margin: f64) -> Self {
        self.config.lease_renewal_margin = margin;
        self
    }

    /// Set the reconnect backoff range.
    pub fn with_reconnect_backoff(mut self, initial: Duration, max: Duration) -> Self {
        self.config.reconnect_backoff_initial = initial;
        self.config.reconnect_backoff_max = max;
        self
    }

    /// Set the stop drain bound.
    pub fn with_stop_deadline(mut self, deadline: Duration) -> Self {
        self.config.stop_deadline = deadline;
        self
    }

    /// Build and validate the configuration.
    pub fn build(self) -> Result<ClientConfig, String> {
        self.config.validate()?;
        Ok(self.config)
    }
}
