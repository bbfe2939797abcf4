//! Per-client record of recent request arrival times.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Ordered request timestamps for a single client, oldest first.
///
/// Entries older than the window are logically expired. They are dropped by
/// [`ClientWindow::prune`], which both the per-request path and the registry
/// sweep call.
#[derive(Debug, Clone, Default)]
pub struct ClientWindow {
    timestamps: VecDeque<Instant>,
}

impl ClientWindow {
    /// Create an empty window.
    pub fn new() -> Self {
        Self {
            timestamps: VecDeque::new(),
        }
    }

    /// Create an empty window with room for `capacity` timestamps.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            timestamps: VecDeque::with_capacity(capacity),
        }
    }

    /// Remove every timestamp older than `window` relative to `now`.
    ///
    /// A timestamp exactly `window` old is still live. Returns the number of
    /// entries removed.
    pub fn prune(&mut self, now: Instant, window: Duration) -> usize {
        let before = self.timestamps.len();
        while let Some(&oldest) = self.timestamps.front() {
            if now.saturating_duration_since(oldest) > window {
                self.timestamps.pop_front();
            } else {
                break;
            }
        }
        before - self.timestamps.len()
    }

    /// Record a request at `at`.
    ///
    /// Keeps the sequence ordered even if callers race and hand in instants
    /// slightly out of order.
    pub fn record(&mut self, at: Instant) {
        match self.timestamps.back() {
            Some(&newest) if at < newest => {
                let idx = self.timestamps.partition_point(|&t| t <= at);
                self.timestamps.insert(idx, at);
            }
            _ => self.timestamps.push_back(at),
        }
    }

    /// Number of timestamps currently held.
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    /// Check if the window holds no timestamps.
    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// The oldest held timestamp, the first to expire.
    pub fn oldest(&self) -> Option<Instant> {
        self.timestamps.front().copied()
    }

    /// The newest held timestamp, used as the client's last activity.
    pub fn last_activity(&self) -> Option<Instant> {
        self.timestamps.back().copied()
    }

    /// Iterate over held timestamps, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = Instant> + '_ {
        self.timestamps.iter().copied()
    }
}
