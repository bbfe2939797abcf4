//! Manually driven clock.

use crate::application::ports::Clock;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Clock whose time only moves when told to.
///
/// Clones share the same current instant, so a test can hand one clone to a
/// limiter and advance time through another.
///
/// # Examples
///
/// ```
/// use request_throttle::infrastructure::mocks::MockClock;
/// use request_throttle::application::ports::Clock;
/// use std::time::{Duration, Instant};
///
/// let start = Instant::now();
/// let clock = MockClock::new(start);
/// let shared = clock.clone();
///
/// shared.advance(Duration::from_secs(30));
/// assert_eq!(clock.now(), start + Duration::from_secs(30));
///
/// clock.set(start);
/// assert_eq!(shared.now(), start);
/// ```
#[derive(Debug, Clone)]
pub struct MockClock {
    current: Arc<Mutex<Instant>>,
}

impl MockClock {
    /// Create a mock clock starting at `start`.
    pub fn new(start: Instant) -> Self {
        Self {
            current: Arc::new(Mutex::new(start)),
        }
    }

    /// Move the clock forward by `duration`.
    pub fn advance(&self, duration: Duration) {
        *self.lock() += duration;
    }

    /// Jump to a specific instant, possibly backwards.
    pub fn set(&self, instant: Instant) {
        *self.lock() = instant;
    }

    // A panicking test thread must not wedge the other clones
    fn lock(&self) -> MutexGuard<'_, Instant> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Clock for MockClock {
    fn now(&self) -> Instant {
        *self.lock()
    }
}
