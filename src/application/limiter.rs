//! Rate limiter coordination logic.
//!
//! The rate limiter owns the client registry, applies the sliding-window
//! policy to each request and keeps the registry bounded by sweeping idle
//! clients.

use crate::application::metrics::Metrics;
use crate::application::ports::{Clock, Storage};
use crate::application::registry::RateLimitRegistry;
use crate::domain::{
    client::ClientId,
    decision::RateLimitDecision,
    policy::{PolicyError, SlidingWindowPolicy, DEFAULT_LIMIT, DEFAULT_WINDOW},
    window::ClientWindow,
};
use crate::infrastructure::clock::SystemClock;
use crate::infrastructure::eviction::{LruEviction, DEFAULT_MAX_CLIENTS};
use crate::infrastructure::storage::ShardedStorage;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// Storage used by limiters created through [`RateLimiterBuilder`].
pub type DefaultStorage = Arc<ShardedStorage<ClientId, ClientWindow>>;

/// Error returned when building a rate limiter fails.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BuildError {
    /// Invalid limit or window
    #[error(transparent)]
    Policy(#[from] PolicyError),
    /// Registry capacity must be greater than zero
    #[error("max clients must be greater than 0")]
    ZeroMaxClients,
    /// Opportunistic sweep period must be greater than zero
    #[error("sweep period must be greater than 0")]
    ZeroSweepPeriod,
}

/// Per-client sliding-window rate limiter.
///
/// Cloning is cheap; clones share the registry and metrics.
///
/// # Example
/// ```
/// use request_throttle::{ClientId, RateLimiter};
/// use std::time::{Duration, Instant};
///
/// let limiter = RateLimiter::builder()
///     .with_limit(2)
///     .with_window(Duration::from_secs(10))
///     .build()
///     .unwrap();
///
/// let client = ClientId::new("198.51.100.4").unwrap();
/// let now = Instant::now();
///
/// assert!(limiter.evaluate(&client, now).is_allowed());
/// assert!(limiter.evaluate(&client, now).is_allowed());
/// assert_eq!(limiter.evaluate(&client, now).retry_after_secs(), Some(10));
/// ```
#[derive(Clone)]
pub struct RateLimiter<S = DefaultStorage>
where
    S: Storage<ClientId, ClientWindow> + Clone,
{
    registry: RateLimitRegistry<S>,
    policy: SlidingWindowPolicy,
    metrics: Metrics,
    sweep_every: Option<u64>,
    evaluations: Arc<AtomicU64>,
}

impl RateLimiter {
    /// Create a builder with default settings.
    pub fn builder() -> RateLimiterBuilder {
        RateLimiterBuilder::new()
    }
}

impl<S> RateLimiter<S>
where
    S: Storage<ClientId, ClientWindow> + Clone,
{
    /// Create a rate limiter over an existing registry.
    ///
    /// `metrics` should be the same instance the storage reports evictions
    /// to, if it reports any.
    pub fn new(registry: RateLimitRegistry<S>, policy: SlidingWindowPolicy, metrics: Metrics) -> Self {
        Self {
            registry,
            policy,
            metrics,
            sweep_every: None,
            evaluations: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Evaluate a request from `client` arriving at `now`.
    ///
    /// Expired timestamps are dropped first. The request is admitted and
    /// recorded if fewer than `limit` live timestamps remain; otherwise it is
    /// rejected with the whole seconds until the oldest one expires. The
    /// read-modify-write is atomic per client, so concurrent callers never
    /// admit more than `limit` requests in a window.
    ///
    /// Never fails.
    pub fn evaluate(&self, client: &ClientId, now: Instant) -> RateLimitDecision {
        let policy = self.policy;
        let decision = self
            .registry
            .with_window_at(client, now, |window, now| policy.register(window, now));

        match decision {
            RateLimitDecision::Allow => {
                self.metrics.record_admitted();
                trace!(client_id = %client, "request admitted");
            }
            RateLimitDecision::Reject { retry_after_secs } => {
                self.metrics.record_rejected();
                debug!(client_id = %client, retry_after_secs, "request rejected");
            }
        }

        self.maybe_sweep(now);
        decision
    }

    /// Evaluate a request from `client` at the current time.
    pub fn check(&self, client: &ClientId) -> RateLimitDecision {
        self.evaluate(client, self.registry.now())
    }

    /// Prune every window against `now` and forget clients left with none.
    ///
    /// Returns the number of clients removed.
    pub fn sweep(&self, now: Instant) -> usize {
        let removed = self.registry.sweep(now, self.policy.window());
        if removed > 0 {
            self.metrics.record_swept(removed);
            debug!(removed, remaining = self.registry.len(), "swept idle clients");
        }
        removed
    }

    /// Sweep at the current time.
    pub fn sweep_now(&self) -> usize {
        self.sweep(self.registry.now())
    }

    fn maybe_sweep(&self, now: Instant) {
        let Some(period) = self.sweep_every else {
            return;
        };
        let count = self.evaluations.fetch_add(1, Ordering::Relaxed) + 1;
        if count % period == 0 {
            self.sweep(now);
        }
    }

    /// Number of clients currently tracked.
    pub fn client_count(&self) -> usize {
        self.registry.len()
    }

    /// Check whether `client` currently has a window.
    pub fn tracks(&self, client: &ClientId) -> bool {
        self.registry.contains(client)
    }

    /// Get a reference to the metrics.
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// The policy applied to every client.
    pub fn policy(&self) -> &SlidingWindowPolicy {
        &self.policy
    }

    /// Get a reference to the registry.
    pub fn registry(&self) -> &RateLimitRegistry<S> {
        &self.registry
    }
}

impl<S> fmt::Debug for RateLimiter<S>
where
    S: Storage<ClientId, ClientWindow> + Clone,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RateLimiter")
            .field("policy", &self.policy)
            .field("clients", &self.registry.len())
            .field("sweep_every", &self.sweep_every)
            .finish()
    }
}

/// Builder for configuring a [`RateLimiter`].
#[derive(Debug, Clone)]
pub struct RateLimiterBuilder {
    limit: usize,
    window: Duration,
    max_clients: Option<usize>,
    sweep_every: Option<u64>,
    clock: Option<Arc<dyn Clock>>,
}

impl RateLimiterBuilder {
    /// Create a builder with defaults: 100 requests per 60 seconds, at most
    /// 10 000 tracked clients, no opportunistic sweep, system clock.
    pub fn new() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            window: DEFAULT_WINDOW,
            max_clients: Some(DEFAULT_MAX_CLIENTS),
            sweep_every: None,
            clock: None,
        }
    }

    /// Set the maximum admitted requests per window.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Set the window length.
    pub fn with_window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }

    /// Cap the number of tracked clients.
    ///
    /// When a new client arrives at capacity, the least recently active
    /// client's window is evicted.
    pub fn with_max_clients(mut self, max_clients: usize) -> Self {
        self.max_clients = Some(max_clients);
        self
    }

    /// Track any number of clients.
    pub fn with_unlimited_clients(mut self) -> Self {
        self.max_clients = None;
        self
    }

    /// Also sweep the registry on every `period`-th evaluation.
    pub fn with_sweep_every(mut self, period: u64) -> Self {
        self.sweep_every = Some(period);
        self
    }

    /// Set a custom clock (mainly for tests).
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Build the rate limiter.
    ///
    /// # Errors
    /// Returns `BuildError` if the limit, window, client cap or sweep period
    /// is zero.
    pub fn build(self) -> Result<RateLimiter, BuildError> {
        let policy = SlidingWindowPolicy::new(self.limit, self.window)?;

        if self.sweep_every == Some(0) {
            return Err(BuildError::ZeroSweepPeriod);
        }

        let metrics = Metrics::new();
        let mut storage = ShardedStorage::new().with_metrics(metrics.clone());
        if let Some(max_clients) = self.max_clients {
            if max_clients == 0 {
                return Err(BuildError::ZeroMaxClients);
            }
            storage = storage.with_eviction_policy(Arc::new(LruEviction::new(max_clients)));
        }

        let clock = self
            .clock
            .unwrap_or_else(|| Arc::new(SystemClock::new()));
        let registry = RateLimitRegistry::new(Arc::new(storage), clock);

        let mut limiter = RateLimiter::new(registry, policy, metrics);
        limiter.sweep_every = self.sweep_every;
        Ok(limiter)
    }
}

impl Default for RateLimiterBuilder {
    fn default() -> Self {
        Self::new()
    }
}
