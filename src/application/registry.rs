//! Central registry mapping client identifiers to their sliding windows.
//!
//! The registry is process-local and starts empty; a restart resets every
//! client's history.

use crate::application::ports::{Clock, LastActivity, Storage};
use crate::domain::{client::ClientId, window::ClientWindow};
use std::sync::Arc;
use std::time::{Duration, Instant};

impl LastActivity for ClientWindow {
    fn last_activity(&self) -> Option<Instant> {
        ClientWindow::last_activity(self)
    }
}

/// Registry managing all per-client windows.
///
/// Generic over the storage implementation. In production, use
/// `Arc<ShardedStorage>`.
#[derive(Clone)]
pub struct RateLimitRegistry<S>
where
    S: Storage<ClientId, ClientWindow> + Clone,
{
    storage: S,
    clock: Arc<dyn Clock>,
}

impl<S> RateLimitRegistry<S>
where
    S: Storage<ClientId, ClientWindow> + Clone,
{
    /// Create a new registry over `storage`, reading time from `clock`.
    pub fn new(storage: S, clock: Arc<dyn Clock>) -> Self {
        Self { storage, clock }
    }

    /// Access or create the window for `client` at the clock's current time.
    pub fn with_window<F, R>(&self, client: &ClientId, f: F) -> R
    where
        F: FnOnce(&mut ClientWindow, Instant) -> R,
    {
        self.with_window_at(client, self.clock.now(), f)
    }

    /// Access or create the window for `client` at an explicit instant.
    ///
    /// The callback runs while the storage holds exclusive access to this
    /// client's entry.
    pub fn with_window_at<F, R>(&self, client: &ClientId, now: Instant, f: F) -> R
    where
        F: FnOnce(&mut ClientWindow, Instant) -> R,
    {
        self.storage
            .with_entry_mut(client.clone(), ClientWindow::new, |window| f(window, now))
    }

    /// Prune every window against `now` and drop the ones left empty.
    ///
    /// Returns the number of clients removed.
    pub fn sweep(&self, now: Instant, window: Duration) -> usize {
        let mut removed = 0;
        self.storage.retain(|_, client_window| {
            client_window.prune(now, window);
            let keep = !client_window.is_empty();
            if !keep {
                removed += 1;
            }
            keep
        });
        removed
    }

    /// Current instant according to the registry's clock.
    pub fn now(&self) -> Instant {
        self.clock.now()
    }

    /// Check if `client` currently has a window.
    pub fn contains(&self, client: &ClientId) -> bool {
        self.storage.contains_key(client)
    }

    /// Get the number of tracked clients.
    pub fn len(&self) -> usize {
        self.storage.len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }

    /// Clear all tracked state.
    pub fn clear(&self) {
        self.storage.clear();
    }

    /// Iterate over all windows with a callback.
    pub fn for_each<F>(&self, f: F)
    where
        F: FnMut(&ClientId, &ClientWindow),
    {
        self.storage.for_each(f);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::mocks::MockClock;
    use crate::infrastructure::storage::ShardedStorage;

    fn registry(clock: &MockClock) -> RateLimitRegistry<Arc<ShardedStorage<ClientId, ClientWindow>>> {
        RateLimitRegistry::new(Arc::new(ShardedStorage::new()), Arc::new(clock.clone()))
    }

    fn client(id: &str) -> ClientId {
        ClientId::new(id).unwrap()
    }

    #[test]
    fn test_registry_creation() {
        let clock = MockClock::new(Instant::now());
        let registry = registry(&clock);

        assert_eq!(registry.len(), 0);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_with_window_creates_then_reuses() {
        let clock = MockClock::new(Instant::now());
        let registry = registry(&clock);
        let alice = client("alice");

        registry.with_window(&alice, |window, now| {
            assert!(window.is_empty());
            window.record(now);
        });
        assert!(registry.contains(&alice));

        clock.advance(Duration::from_secs(1));
        let len = registry.with_window(&alice, |window, now| {
            window.record(now);
            window.len()
        });

        assert_eq!(len, 2);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_sweep_removes_only_idle_clients() {
        let start = Instant::now();
        let clock = MockClock::new(start);
        let registry = registry(&clock);
        let window = Duration::from_secs(60);

        registry.with_window(&client("idle"), |w, now| w.record(now));
        clock.advance(Duration::from_secs(50));
        registry.with_window(&client("busy"), |w, now| w.record(now));

        // idle's only entry is 70s old, busy's is 20s old
        clock.advance(Duration::from_secs(20));
        let removed = registry.sweep(clock.now(), window);

        assert_eq!(removed, 1);
        assert!(!registry.contains(&client("idle")));
        assert!(registry.contains(&client("busy")));
    }

    #[test]
    fn test_sweep_prunes_surviving_windows() {
        let start = Instant::now();
        let clock = MockClock::new(start);
        let registry = registry(&clock);
        let bob = client("bob");

        registry.with_window(&bob, |w, now| w.record(now));
        clock.advance(Duration::from_secs(30));
        registry.with_window(&bob, |w, now| w.record(now));
        clock.advance(Duration::from_secs(40));

        assert_eq!(registry.sweep(clock.now(), Duration::from_secs(60)), 0);

        let remaining = registry.with_window(&bob, |w, _| w.len());
        assert_eq!(remaining, 1);
    }

    #[test]
    fn test_clear() {
        let clock = MockClock::new(Instant::now());
        let registry = registry(&clock);

        for i in 0..10 {
            registry.with_window(&client(&format!("client-{}", i)), |w, now| w.record(now));
        }
        assert_eq!(registry.len(), 10);

        let mut seen = 0;
        registry.for_each(|_, window| seen += window.len());
        assert_eq!(seen, 10);

        registry.clear();
        assert!(registry.is_empty());
    }

    #[test]
    fn test_concurrent_access() {
        use std::thread;

        let clock = MockClock::new(Instant::now());
        let registry = Arc::new(registry(&clock));
        let mut handles = vec![];

        for i in 0..10 {
            let registry_clone = Arc::clone(&registry);
            handles.push(thread::spawn(move || {
                for j in 0..100 {
                    let id = ClientId::new(&format!("client_{}_{}", i, j)).unwrap();
                    registry_clone.with_window(&id, |w, now| w.record(now));
                }
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(registry.len(), 1000);
    }
}
