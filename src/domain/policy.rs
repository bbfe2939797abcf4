//! Sliding-window admission policy.
//!
//! The policy decides, for one client window, whether a request at `now`
//! may proceed: at most `limit` requests are admitted within any span of
//! `window` ending at `now`.

use crate::domain::{decision::RateLimitDecision, window::ClientWindow};
use std::time::{Duration, Instant};

/// Default maximum admitted requests per window.
pub const DEFAULT_LIMIT: usize = 100;

/// Default window length.
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(60);

/// Error returned when a policy is configured with invalid parameters.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PolicyError {
    /// The request limit must admit at least one request
    #[error("limit must be greater than 0")]
    ZeroLimit,
    /// The window must have a non-zero length
    #[error("window duration must be greater than 0")]
    ZeroWindow,
}

/// Sliding-window rate limiting policy.
///
/// # Example
/// ```
/// use request_throttle::{ClientWindow, SlidingWindowPolicy};
/// use std::time::{Duration, Instant};
///
/// let policy = SlidingWindowPolicy::new(3, Duration::from_secs(60)).unwrap();
/// let mut window = ClientWindow::new();
/// let t0 = Instant::now();
///
/// for i in 0..3 {
///     assert!(policy.register(&mut window, t0 + Duration::from_secs(i)).is_allowed());
/// }
///
/// // The fourth request inside the window waits for t0 to age out
/// let decision = policy.register(&mut window, t0 + Duration::from_secs(5));
/// assert_eq!(decision.retry_after_secs(), Some(55));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlidingWindowPolicy {
    limit: usize,
    window: Duration,
}

impl SlidingWindowPolicy {
    /// Create a new sliding-window policy.
    ///
    /// # Arguments
    /// * `limit` - Maximum admitted requests per window
    /// * `window` - Length of the sliding window
    ///
    /// # Errors
    /// Returns `PolicyError` if either parameter is zero.
    pub fn new(limit: usize, window: Duration) -> Result<Self, PolicyError> {
        if limit == 0 {
            return Err(PolicyError::ZeroLimit);
        }
        if window.is_zero() {
            return Err(PolicyError::ZeroWindow);
        }
        Ok(Self { limit, window })
    }

    /// Maximum admitted requests per window.
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Length of the sliding window.
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Evaluate a request at `now` against `state` and update it.
    ///
    /// Expired entries are always dropped first, whatever the outcome. An
    /// admitted request is appended to the window; a rejected one is not.
    pub fn register(&self, state: &mut ClientWindow, now: Instant) -> RateLimitDecision {
        state.prune(now, self.window);

        if state.len() < self.limit {
            state.record(now);
            return RateLimitDecision::Allow;
        }

        let retry_after_secs = state
            .oldest()
            .map(|oldest| self.retry_after_secs(oldest, now))
            .unwrap_or_else(|| ceil_secs(self.window));
        RateLimitDecision::Reject { retry_after_secs }
    }

    /// Whole seconds, rounded up, until `oldest` leaves the window.
    fn retry_after_secs(&self, oldest: Instant, now: Instant) -> u64 {
        let wait = match oldest.checked_add(self.window) {
            Some(frees_at) => frees_at.saturating_duration_since(now),
            None => self.window,
        };
        ceil_secs(wait)
    }
}

impl Default for SlidingWindowPolicy {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            window: DEFAULT_WINDOW,
        }
    }
}

fn ceil_secs(duration: Duration) -> u64 {
    duration.as_secs() + u64::from(duration.subsec_nanos() > 0)
}
