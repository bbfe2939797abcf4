//! Observability metrics for rate limiting.
//!
//! Provides counters about admission decisions and registry maintenance.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Metrics tracking rate limiting statistics.
///
/// All metrics use atomic operations for thread-safe updates and reads.
/// Clones share the same counters.
#[derive(Debug, Clone)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

#[derive(Debug, Default)]
struct MetricsInner {
    requests_admitted: AtomicU64,
    requests_rejected: AtomicU64,
    /// Windows dropped to respect the registry capacity
    clients_evicted: AtomicU64,
    /// Windows removed by sweeps after going idle
    clients_swept: AtomicU64,
}

impl Metrics {
    /// Create a new metrics tracker.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(MetricsInner::default()),
        }
    }

    pub(crate) fn record_admitted(&self) {
        self.inner.requests_admitted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_rejected(&self) {
        self.inner.requests_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_eviction(&self) {
        self.inner.clients_evicted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_swept(&self, count: usize) {
        self.inner
            .clients_swept
            .fetch_add(count as u64, Ordering::Relaxed);
    }

    /// Get the total number of requests admitted.
    pub fn requests_admitted(&self) -> u64 {
        self.inner.requests_admitted.load(Ordering::Relaxed)
    }

    /// Get the total number of requests rejected.
    pub fn requests_rejected(&self) -> u64 {
        self.inner.requests_rejected.load(Ordering::Relaxed)
    }

    /// Get the total number of client windows evicted for capacity.
    pub fn clients_evicted(&self) -> u64 {
        self.inner.clients_evicted.load(Ordering::Relaxed)
    }

    /// Get the total number of idle client windows removed by sweeps.
    pub fn clients_swept(&self) -> u64 {
        self.inner.clients_swept.load(Ordering::Relaxed)
    }

    /// Get a snapshot of all metrics.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            requests_admitted: self.requests_admitted(),
            requests_rejected: self.requests_rejected(),
            clients_evicted: self.clients_evicted(),
            clients_swept: self.clients_swept(),
        }
    }

    /// Reset all metrics to zero.
    pub fn reset(&self) {
        self.inner.requests_admitted.store(0, Ordering::Relaxed);
        self.inner.requests_rejected.store(0, Ordering::Relaxed);
        self.inner.clients_evicted.store(0, Ordering::Relaxed);
        self.inner.clients_swept.store(0, Ordering::Relaxed);
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// A point-in-time snapshot of metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Total number of requests admitted
    pub requests_admitted: u64,
    /// Total number of requests rejected
    pub requests_rejected: u64,
    /// Total number of client windows evicted for capacity
    pub clients_evicted: u64,
    /// Total number of idle client windows removed by sweeps
    pub clients_swept: u64,
}

impl MetricsSnapshot {
    /// Ratio of rejected to evaluated requests (0.0 to 1.0).
    ///
    /// Returns 0.0 if no requests have been evaluated.
    pub fn rejection_rate(&self) -> f64 {
        let total = self.total_requests();
        if total == 0 {
            0.0
        } else {
            self.requests_rejected as f64 / total as f64
        }
    }

    /// Total number of evaluated requests (admitted + rejected).
    pub fn total_requests(&self) -> u64 {
        self.requests_admitted.saturating_add(self.requests_rejected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_initial_state() {
        let metrics = Metrics::new();
        assert_eq!(metrics.snapshot(), MetricsSnapshot {
            requests_admitted: 0,
            requests_rejected: 0,
            clients_evicted: 0,
            clients_swept: 0,
        });
    }

    #[test]
    fn test_record_counters() {
        let metrics = Metrics::new();
        metrics.record_admitted();
        metrics.record_admitted();
        metrics.record_rejected();
        metrics.record_eviction();
        metrics.record_swept(4);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.requests_admitted, 2);
        assert_eq!(snapshot.requests_rejected, 1);
        assert_eq!(snapshot.clients_evicted, 1);
        assert_eq!(snapshot.clients_swept, 4);
        assert_eq!(snapshot.total_requests(), 3);
    }

    #[test]
    fn test_rejection_rate() {
        let metrics = Metrics::new();
        assert_eq!(metrics.snapshot().rejection_rate(), 0.0);

        metrics.record_admitted();
        metrics.record_rejected();
        assert!((metrics.snapshot().rejection_rate() - 0.5).abs() < f64::EPSILON);

        metrics.record_rejected();
        metrics.record_rejected();
        assert!((metrics.snapshot().rejection_rate() - 0.75).abs() < f64::EPSILON);
    }

    #[test]
    fn test_reset() {
        let metrics = Metrics::new();
        metrics.record_admitted();
        metrics.record_rejected();
        metrics.record_eviction();
        metrics.record_swept(2);

        metrics.reset();
        assert_eq!(metrics.snapshot().total_requests(), 0);
        assert_eq!(metrics.clients_evicted(), 0);
        assert_eq!(metrics.clients_swept(), 0);
    }

    #[test]
    fn test_metrics_clone_shares_counters() {
        let metrics1 = Metrics::new();
        metrics1.record_admitted();

        let metrics2 = metrics1.clone();
        metrics2.record_admitted();

        assert_eq!(metrics1.requests_admitted(), 2);
        assert_eq!(metrics2.requests_admitted(), 2);
    }

    #[test]
    fn test_concurrent_updates() {
        use std::thread;

        let metrics = Metrics::new();
        let mut handles = vec![];

        for _ in 0..10 {
            let m = metrics.clone();
            handles.push(thread::spawn(move || {
                for _ in 0..100 {
                    m.record_admitted();
                    m.record_rejected();
                }
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(metrics.requests_admitted(), 1000);
        assert_eq!(metrics.requests_rejected(), 1000);
    }
}
