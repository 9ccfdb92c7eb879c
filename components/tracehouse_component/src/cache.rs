//! Memoized analysis results
//!
//! Analyses are keyed by a fingerprint of their complete input and evicted
//! least-recently-used first once the cache is full. Values are shared as
//! `Arc`s so a hit never copies a processed trace.

use parking_lot::RwLock;
use serde::Serialize;
use std::collections::hash_map::DefaultHasher;
use std::collections::{HashMap, VecDeque};
use std::hash::Hasher;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

use crate::error::Result;

/// Cache key derived from an analysis input
pub type Fingerprint = u64;

/// Fingerprint the JSON form of an input
pub fn fingerprint<T: Serialize + ?Sized>(input: &T) -> Result<Fingerprint> {
    let bytes = serde_json::to_vec(input)?;
    let mut hasher = DefaultHasher::new();
    hasher.write(&bytes);
    Ok(hasher.finish())
}

/// Statistics about cache usage
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of cache hits
    pub hits: u64,
    /// Number of cache misses
    pub misses: u64,
    /// Number of entries evicted
    pub evictions: u64,
    /// Current cache size
    pub size: usize,
}

impl CacheStats {
    /// Calculate hit rate as a percentage
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits as f64 / total as f64) * 100.0
        }
    }
}

/// LRU cache of analysis results
pub struct AnalysisCache<V> {
    /// Map from fingerprint to result
    entries: RwLock<HashMap<Fingerprint, Arc<V>>>,
    /// LRU order tracking (most recent at back)
    lru_order: RwLock<VecDeque<Fingerprint>>,
    capacity: usize,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl<V> AnalysisCache<V> {
    /// Create a cache holding at most `capacity` results
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::with_capacity(capacity)),
            lru_order: RwLock::new(VecDeque::with_capacity(capacity)),
            capacity,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    /// Maximum number of results kept
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Look up a result, marking it most recently used
    pub fn get(&self, key: Fingerprint) -> Option<Arc<V>> {
        let entry = self.entries.read().get(&key).cloned();

        match entry {
            Some(value) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                let mut lru = self.lru_order.write();
                lru.retain(|k| *k != key);
                lru.push_back(key);
                debug!("Analysis cache hit: {:016x}", key);
                Some(value)
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                debug!("Analysis cache miss: {:016x}", key);
                None
            }
        }
    }

    /// Store a result, evicting the least recently used one when full
    pub fn insert(&self, key: Fingerprint, value: Arc<V>) {
        if self.capacity == 0 {
            return;
        }

        let mut entries = self.entries.write();
        let mut lru = self.lru_order.write();

        if entries.insert(key, value).is_some() {
            lru.retain(|k| *k != key);
        }
        lru.push_back(key);

        while entries.len() > self.capacity {
            let Some(oldest) = lru.pop_front() else {
                break;
            };
            entries.remove(&oldest);
            self.evictions.fetch_add(1, Ordering::Relaxed);
            debug!("Evicted analysis {:016x}", oldest);
        }
    }

    /// Number of cached results
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether the cache holds no results
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Drop every cached result; statistics are kept
    pub fn clear(&self) {
        let mut entries = self.entries.write();
        let mut lru = self.lru_order.write();
        entries.clear();
        lru.clear();
    }

    /// Snapshot of the cache statistics
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            size: self.len(),
        }
    }
}

impl<V> std::fmt::Debug for AnalysisCache<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalysisCache")
            .field("capacity", &self.capacity)
            .field("stats", &self.stats())
            .finish()
    }
}
