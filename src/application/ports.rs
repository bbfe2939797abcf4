//! Ports (interfaces) for the application layer.
//!
//! In hexagonal architecture, ports define the interfaces that the application
//! layer needs. Infrastructure adapters implement these ports.

use std::fmt::Debug;
use std::hash::Hash;
use std::time::Instant;

/// Candidate entry for eviction consideration.
#[derive(Debug, Clone)]
pub struct EvictionCandidate<K> {
    /// The key of the entry
    pub key: K,
    /// Last activity time of the entry
    pub last_access: Instant,
}

/// Port for eviction policy decisions.
///
/// Storage delegates the choice of which entry to drop, once it is full, to
/// a pluggable policy.
pub trait EvictionPolicy<K>: Send + Sync + Debug
where
    K: Clone,
{
    /// Select a victim from the given candidates for eviction.
    ///
    /// Returns `None` if no candidate should be evicted.
    fn select_victim(&self, candidates: &[EvictionCandidate<K>]) -> Option<K>;

    /// Check if inserting one more entry requires an eviction first.
    fn should_evict(&self, current_entries: usize) -> bool;

    /// Maximum number of candidates to sample when selecting a victim.
    fn sample_size(&self) -> usize {
        16
    }
}

/// Values that can report when they were last active.
///
/// Used by storage to build eviction candidates without cloning values.
pub trait LastActivity {
    /// Instant of the most recent activity, if any.
    fn last_activity(&self) -> Option<Instant>;
}

/// Port for obtaining current time.
///
/// Infrastructure provides concrete implementations (SystemClock, MockClock).
pub trait Clock: Send + Sync + Debug {
    /// Get the current instant.
    fn now(&self) -> Instant;
}

/// Port for concurrent key-value storage.
///
/// Implementations must run `with_entry_mut`'s accessor while holding
/// exclusive access to that key, so a read-modify-write on one key is atomic
/// with respect to other callers on the same key.
pub trait Storage<K, V>: Send + Sync + Debug
where
    K: Hash + Eq + Clone + Send + Sync,
    V: Send + Sync,
{
    /// Access an entry with mutable access, creating it if necessary.
    ///
    /// # Arguments
    /// * `key` - The key to look up
    /// * `factory` - Function to create a new value if the key doesn't exist
    /// * `accessor` - Function that gets mutable access to the value
    ///
    /// # Returns
    /// The result from the accessor function
    fn with_entry_mut<F, R>(&self, key: K, factory: impl FnOnce() -> V, accessor: F) -> R
    where
        F: FnOnce(&mut V) -> R;

    /// Check if a key is present.
    fn contains_key(&self, key: &K) -> bool;

    /// Get the number of entries in the storage.
    fn len(&self) -> usize;

    /// Check if the storage is empty.
    fn is_empty(&self) -> bool;

    /// Clear all entries from the storage.
    fn clear(&self);

    /// Iterate over all entries, providing access to both key and value.
    fn for_each<F>(&self, f: F)
    where
        F: FnMut(&K, &V);

    /// Remove entries for which the predicate returns false.
    fn retain<F>(&self, f: F)
    where
        F: FnMut(&K, &mut V) -> bool;
}
