//! Storage implementations for client windows.
//!
//! Provides concurrent, sharded storage with an optional capacity cap.

use crate::application::metrics::Metrics;
use crate::application::ports::{EvictionCandidate, EvictionPolicy, LastActivity, Storage};
use ahash::RandomState;
use dashmap::DashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Thread-safe sharded storage backed by DashMap.
///
/// Each shard has its own lock. An entry closure runs under its shard's write
/// lock, which makes per-key read-modify-write atomic without serializing
/// unrelated clients.
///
/// With an eviction policy attached, inserting a previously unseen key into a
/// full map first evicts one sampled entry. The sample is a run of consecutive
/// entries starting at a pseudo-random position, so every shard gets
/// inspected over time. Concurrent inserts of new keys can overshoot the cap
/// by the number of racing inserters.
pub struct ShardedStorage<K, V>
where
    K: Eq + Hash + Clone,
{
    map: DashMap<K, V, RandomState>,
    eviction_policy: Option<Arc<dyn EvictionPolicy<K>>>,
    metrics: Option<Metrics>,
    sample_seq: AtomicU64,
}

impl<K, V> ShardedStorage<K, V>
where
    K: Eq + Hash + Clone,
{
    /// Create a new, unbounded sharded storage instance.
    pub fn new() -> Self {
        Self {
            map: DashMap::with_hasher(RandomState::new()),
            eviction_policy: None,
            metrics: None,
            sample_seq: AtomicU64::new(0),
        }
    }

    /// Attach an eviction policy that caps the number of entries.
    pub fn with_eviction_policy(mut self, policy: Arc<dyn EvictionPolicy<K>>) -> Self {
        self.eviction_policy = Some(policy);
        self
    }

    /// Report evictions to the given metrics.
    pub fn with_metrics(mut self, metrics: Metrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Insert or update a value.
    pub fn insert(&self, key: K, value: V) {
        self.map.insert(key, value);
    }

    /// Get a reference to a value.
    pub fn get<Q>(&self, key: &Q) -> Option<dashmap::mapref::one::Ref<'_, K, V>>
    where
        K: std::borrow::Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.map.get(key)
    }

    /// Remove a key and return its value.
    pub fn remove<Q>(&self, key: &Q) -> Option<(K, V)>
    where
        K: std::borrow::Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.map.remove(key)
    }
}

impl<K, V> ShardedStorage<K, V>
where
    K: Eq + Hash + Clone,
    V: LastActivity,
{
    /// Evict one entry chosen by the policy from a bounded sample.
    ///
    /// An entry with no recorded activity is taken straight away. A map no
    /// larger than the sample is scanned whole.
    fn evict_one(&self, policy: &dyn EvictionPolicy<K>) {
        let sample_size = policy.sample_size();
        let mut candidates = Vec::with_capacity(sample_size);
        let mut idle = None;
        let offset = self.sample_offset(sample_size);

        for entry in self.map.iter().skip(offset).take(sample_size) {
            match entry.value().last_activity() {
                Some(last_access) => candidates.push(EvictionCandidate {
                    key: entry.key().clone(),
                    last_access,
                }),
                None => {
                    idle = Some(entry.key().clone());
                    break;
                }
            }
        }

        let Some(victim) = idle.or_else(|| policy.select_victim(&candidates)) else {
            return;
        };

        if self.map.remove(&victim).is_some() {
            debug!(remaining = self.map.len(), "evicted least recently active entry");
            if let Some(metrics) = &self.metrics {
                metrics.record_eviction();
            }
        }
    }

    /// Start of the next sample, chosen so the sample fits inside the map.
    fn sample_offset(&self, sample_size: usize) -> usize {
        let span = self.map.len().saturating_sub(sample_size);
        if span == 0 {
            return 0;
        }
        let seq = self.sample_seq.fetch_add(1, Ordering::Relaxed);
        (self.map.hasher().hash_one(seq) % (span as u64 + 1)) as usize
    }
}

impl<K, V> Default for ShardedStorage<K, V>
where
    K: Eq + Hash + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> fmt::Debug for ShardedStorage<K, V>
where
    K: Eq + Hash + Clone,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShardedStorage")
            .field("len", &self.map.len())
            .field("eviction_policy", &self.eviction_policy)
            .finish()
    }
}

// Implement the Storage port
impl<K, V> Storage<K, V> for ShardedStorage<K, V>
where
    K: Hash + Eq + Clone + Send + Sync,
    V: LastActivity + Send + Sync,
{
    fn with_entry_mut<F, R>(&self, key: K, factory: impl FnOnce() -> V, accessor: F) -> R
    where
        F: FnOnce(&mut V) -> R,
    {
        if let Some(policy) = &self.eviction_policy {
            if !self.map.contains_key(&key) && policy.should_evict(self.map.len()) {
                self.evict_one(policy.as_ref());
            }
        }

        let mut value_ref = self.map.entry(key).or_insert_with(factory);
        accessor(&mut value_ref)
    }

    fn contains_key(&self, key: &K) -> bool {
        self.map.contains_key(key)
    }

    fn len(&self) -> usize {
        self.map.len()
    }

    fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    fn clear(&self) {
        self.map.clear()
    }

    fn for_each<F>(&self, mut f: F)
    where
        F: FnMut(&K, &V),
    {
        for entry in self.map.iter() {
            f(entry.key(), entry.value());
        }
    }

    fn retain<F>(&self, f: F)
    where
        F: FnMut(&K, &mut V) -> bool,
    {
        self.map.retain(f);
    }
}

// Implement Storage for Arc<ShardedStorage> to allow it to be used directly
impl<K, V> Storage<K, V> for Arc<ShardedStorage<K, V>>
where
    K: Hash + Eq + Clone + Send + Sync,
    V: LastActivity + Send + Sync,
{
    fn with_entry_mut<F, R>(&self, key: K, factory: impl FnOnce() -> V, accessor: F) -> R
    where
        F: FnOnce(&mut V) -> R,
    {
        (**self).with_entry_mut(key, factory, accessor)
    }

    fn contains_key(&self, key: &K) -> bool {
        (**self).contains_key(key)
    }

    fn len(&self) -> usize {
        (**self).len()
    }

    fn is_empty(&self) -> bool {
        (**self).is_empty()
    }

    fn clear(&self) {
        (**self).clear()
    }

    fn for_each<F>(&self, f: F)
    where
        F: FnMut(&K, &V),
    {
        (**self).for_each(f)
    }

    fn retain<F>(&self, f: F)
    where
        F: FnMut(&K, &mut V) -> bool,
    {
        (**self).retain(f)
    }
}
