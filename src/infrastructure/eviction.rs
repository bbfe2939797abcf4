//! Capacity eviction for the client registry.
//!
//! When the registry is full and a new client arrives, the window whose
//! client was active least recently is dropped. This bounds memory under a
//! flood of distinct identifiers, e.g. a spoofed forwarded-address header.

use crate::application::ports::{EvictionCandidate, EvictionPolicy};

/// Default registry capacity.
pub const DEFAULT_MAX_CLIENTS: usize = 10_000;

/// LRU eviction policy with entry count limit.
///
/// Uses approximate sampling: the victim is the least recently active entry
/// among a bounded sample, not necessarily across the whole map.
#[derive(Debug, Clone)]
pub struct LruEviction {
    max_entries: usize,
    sample_size: usize,
}

impl LruEviction {
    /// Create a new LRU eviction policy with the given entry limit.
    pub fn new(max_entries: usize) -> Self {
        Self {
            max_entries,
            sample_size: 16,
        }
    }

    /// Set how many entries are sampled when choosing a victim.
    pub fn with_sample_size(mut self, sample_size: usize) -> Self {
        self.sample_size = sample_size.max(1);
        self
    }

    /// Maximum number of entries before eviction.
    pub fn max_entries(&self) -> usize {
        self.max_entries
    }
}

impl<K> EvictionPolicy<K> for LruEviction
where
    K: Clone,
{
    fn select_victim(&self, candidates: &[EvictionCandidate<K>]) -> Option<K> {
        candidates
            .iter()
            .min_by_key(|candidate| candidate.last_access)
            .map(|candidate| candidate.key.clone())
    }

    fn should_evict(&self, current_entries: usize) -> bool {
        current_entries >= self.max_entries
    }

    fn sample_size(&self) -> usize {
        self.sample_size
    }
}
