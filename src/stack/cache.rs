//! Memoized stack results.
//!
//! Composed outputs are stored by the [`Fingerprint`] of the configuration
//! that produced them. A reverse index remembers, per filter identifier,
//! every fingerprint whose configuration included that filter, so deleting a
//! filter evicts exactly the entries it took part in.

use crate::core::error::FilterId;
use crate::core::filter::FilterSpec;
use crate::core::types::ImageValue;
use crate::stack::fingerprint::Fingerprint;
use std::collections::{BTreeSet, HashMap};
use std::time::{Duration, Instant};

/// Cached entry with metadata.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The composed output.
    pub image: ImageValue,
    /// When the entry was created.
    pub created_at: Instant,
    /// How long the original computation took.
    pub computation_time: Duration,
    /// Approximate memory size in bytes.
    pub memory_size: usize,
}

impl CacheEntry {
    /// Create a new cache entry.
    pub fn new(image: ImageValue, computation_time: Duration) -> Self {
        let memory_size = std::mem::size_of::<ImageValue>() + image.estimated_memory_size();
        Self {
            image,
            created_at: Instant::now(),
            computation_time,
            memory_size,
        }
    }
}

/// Cache statistics.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CacheStats {
    /// Number of cache hits.
    pub hits: u64,
    /// Number of cache misses.
    pub misses: u64,
    /// Number of entries evicted.
    pub evictions: u64,
    /// Total time saved by cache hits.
    pub time_saved: Duration,
}

impl CacheStats {
    /// Calculate hit ratio.
    pub fn hit_ratio(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            return 0.0;
        }
        self.hits as f64 / total as f64
    }
}

/// Fingerprint-keyed result store with an identifier reverse index.
///
/// There is no size or age bound: entries leave only through
/// [`StackCache::evict_filter`], [`StackCache::invalidate`] or
/// [`StackCache::clear`].
#[derive(Debug, Default)]
pub struct StackCache {
    entries: HashMap<Fingerprint, CacheEntry>,
    reverse: HashMap<FilterId, BTreeSet<Fingerprint>>,
    memory: usize,
    stats: CacheStats,
}

impl StackCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a result. Hits hand out a logical copy of the stored image.
    pub fn get(&mut self, key: &Fingerprint) -> Option<ImageValue> {
        match self.entries.get(key) {
            Some(entry) => {
                self.stats.hits += 1;
                self.stats.time_saved += entry.computation_time;
                Some(entry.image.clone())
            }
            None => {
                self.stats.misses += 1;
                None
            }
        }
    }

    /// Check for a result without touching the statistics.
    pub fn contains(&self, key: &Fingerprint) -> bool {
        self.entries.contains_key(key)
    }

    /// Store a result, replacing any previous entry for the same key.
    pub fn insert(&mut self, key: Fingerprint, image: ImageValue, computation_time: Duration) {
        let entry = CacheEntry::new(image, computation_time);
        self.memory += entry.memory_size;
        if let Some(previous) = self.entries.insert(key, entry) {
            self.memory = self.memory.saturating_sub(previous.memory_size);
        }
    }

    /// Record that every stage of `specs` took part in the configuration `key`.
    pub fn record(&mut self, key: Fingerprint, specs: &[FilterSpec]) {
        for spec in specs {
            self.reverse.entry(spec.identifier.clone()).or_default().insert(key);
        }
    }

    /// Evict every entry the identifier took part in and forget the identifier.
    ///
    /// Returns the number of entries removed.
    pub fn evict_filter(&mut self, identifier: &FilterId) -> usize {
        let Some(keys) = self.reverse.remove(identifier) else {
            return 0;
        };

        let mut removed = 0;
        for key in &keys {
            if let Some(entry) = self.entries.remove(key) {
                self.memory = self.memory.saturating_sub(entry.memory_size);
                removed += 1;
            }
        }

        // Other identifiers may still list the evicted keys.
        for others in self.reverse.values_mut() {
            others.retain(|key| !keys.contains(key));
        }
        self.reverse.retain(|_, set| !set.is_empty());

        self.stats.evictions += removed as u64;
        log::debug!("evicted {} cached results of filter {}", removed, identifier);
        removed
    }

    /// Drop one entry (e.g. after detecting corruption).
    pub fn invalidate(&mut self, key: &Fingerprint) -> bool {
        match self.entries.remove(key) {
            Some(entry) => {
                self.memory = self.memory.saturating_sub(entry.memory_size);
                self.stats.evictions += 1;
                true
            }
            None => false,
        }
    }

    /// Clear the entire cache, reverse index included.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.reverse.clear();
        self.memory = 0;
    }

    /// Fingerprints recorded for an identifier.
    pub fn keys_for(&self, identifier: &FilterId) -> Option<&BTreeSet<Fingerprint>> {
        self.reverse.get(identifier)
    }

    /// Get cache statistics.
    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    /// Get current memory usage in bytes.
    pub fn memory_usage(&self) -> usize {
        self.memory
    }

    /// Get number of cached entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
