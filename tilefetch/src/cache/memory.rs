//! In-memory tile cache with generation-based eviction.
//!
//! Entries live in a `DashMap` so workers writing fetched tiles and the
//! renderer reading them never contend on a single global lock. Each entry
//! carries a "last used" stamp taken from a cache-local generation counter
//! that is bumped on every write and every read hit; eviction removes the
//! lowest stamps first.
//!
//! # Occupancy
//!
//! The cache is bounded by a `(min, max)` target pair rather than a fixed
//! capacity. The planner moves the target with the size of the viewport
//! (see [`OccupancyPolicy`](super::OccupancyPolicy)). Once the entry count
//! exceeds `max`, a compaction pass trims the cache back down to `min`:
//!
//! ```text
//! entries: ───────────────/‾‾‾‾‾‾‾‾ max ‾‾‾\___ min
//!                         add      add     compaction
//! ```
//!
//! Only one compaction runs at a time (guarded by the eviction mutex). Reads
//! hold a shard read guard while cloning the value out, so an entry is never
//! removed while it is being read.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::debug;

use super::{CacheStats, OccupancyPolicy};
use crate::tile::TileIndex;

/// A cached value plus its last-used generation.
#[derive(Debug)]
struct CacheEntry<T> {
    value: T,
    last_used: AtomicU64,
}

impl<T> CacheEntry<T> {
    fn new(value: T, generation: u64) -> Self {
        Self {
            value,
            last_used: AtomicU64::new(generation),
        }
    }

    fn touch(&self, generation: u64) {
        self.last_used.fetch_max(generation, Ordering::Relaxed);
    }

    fn last_used(&self) -> u64 {
        self.last_used.load(Ordering::Relaxed)
    }
}

/// Bounded, thread-safe tile store keyed by [`TileIndex`].
///
/// `find` never triggers a fetch: a miss simply means "ask the fetch
/// subsystem". Values are cloned out on read, so `T` is typically an `Arc`
/// or another cheap handle.
///
/// # Example
///
/// ```
/// use tilefetch::cache::TileCache;
/// use tilefetch::tile::TileIndex;
///
/// let cache: TileCache<u32> = TileCache::new(2, 3);
/// for col in 0..4 {
///     cache.add(TileIndex::new(col, 0, 1), col);
/// }
/// // Exceeding max (3) trims back to min (2), oldest first
/// assert_eq!(cache.len(), 2);
/// assert!(cache.find(&TileIndex::new(0, 0, 1)).is_none());
/// ```
#[derive(Debug)]
pub struct TileCache<T> {
    entries: DashMap<TileIndex, CacheEntry<T>>,
    generation: AtomicU64,
    min_entries: AtomicUsize,
    max_entries: AtomicUsize,
    eviction_lock: Mutex<()>,
    hits: AtomicU64,
    misses: AtomicU64,
    insertions: AtomicU64,
    evictions: AtomicU64,
}

impl<T: Clone + Send + Sync> TileCache<T> {
    /// Create a cache with the given target occupancy.
    ///
    /// `max` is raised to `min` if it is smaller.
    pub fn new(min_entries: usize, max_entries: usize) -> Self {
        Self {
            entries: DashMap::new(),
            generation: AtomicU64::new(0),
            min_entries: AtomicUsize::new(min_entries),
            max_entries: AtomicUsize::new(max_entries.max(min_entries)),
            eviction_lock: Mutex::new(()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            insertions: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    /// Create a cache sized by `policy` for an empty viewport.
    pub fn with_policy(policy: &OccupancyPolicy) -> Self {
        let (min, max) = policy.targets(0);
        Self::new(min, max)
    }

    fn next_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Store a value, replacing any previous value for the index.
    ///
    /// The entry is stamped with a fresh generation. If the cache now holds
    /// more than `max` entries, a compaction pass runs before returning.
    pub fn add(&self, index: TileIndex, value: T) {
        let generation = self.next_generation();
        self.entries.insert(index, CacheEntry::new(value, generation));
        self.insertions.fetch_add(1, Ordering::Relaxed);

        if self.entries.len() > self.max_entries.load(Ordering::Relaxed) {
            self.compact();
        }
    }

    /// Look up a value, refreshing its generation on a hit.
    pub fn find(&self, index: &TileIndex) -> Option<T> {
        match self.entries.get(index) {
            Some(entry) => {
                entry.touch(self.next_generation());
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(entry.value.clone())
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Check for an entry without counting a hit or refreshing it.
    ///
    /// Planning uses this so that merely considering a tile does not make it
    /// look recently used.
    pub fn contains(&self, index: &TileIndex) -> bool {
        self.entries.contains_key(index)
    }

    /// Remove an entry, returning its value if present.
    pub fn remove(&self, index: &TileIndex) -> Option<T> {
        self.entries.remove(index).map(|(_, entry)| entry.value)
    }

    /// Remove all entries. Statistics are kept.
    pub fn clear(&self) {
        let _guard = self.eviction_lock.lock();
        self.entries.clear();
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Move the occupancy target.
    ///
    /// Does not evict by itself; the next `add` (or an explicit
    /// [`compact`](Self::compact)) enforces the new bound.
    pub fn set_target_occupancy(&self, min_entries: usize, max_entries: usize) {
        self.min_entries.store(min_entries, Ordering::Relaxed);
        self.max_entries
            .store(max_entries.max(min_entries), Ordering::Relaxed);
    }

    /// Current `(min, max)` occupancy target.
    pub fn target_occupancy(&self) -> (usize, usize) {
        (
            self.min_entries.load(Ordering::Relaxed),
            self.max_entries.load(Ordering::Relaxed),
        )
    }

    /// Evict least-recently-used entries if the cache is over `max`.
    ///
    /// Trims down to `min`. Entries touched after the eviction candidates
    /// were ranked are skipped. Returns the number of evicted entries.
    pub fn compact(&self) -> usize {
        let _guard = self.eviction_lock.lock();

        let (min, max) = self.target_occupancy();
        let len = self.entries.len();
        if len <= max {
            return 0;
        }

        let mut ranked: Vec<(u64, TileIndex)> = self
            .entries
            .iter()
            .map(|entry| (entry.value().last_used(), *entry.key()))
            .collect();
        ranked.sort_unstable_by_key(|(generation, _)| *generation);

        let excess = ranked.len().saturating_sub(min);
        let mut evicted = 0;
        for (generation, index) in ranked.into_iter().take(excess) {
            if self
                .entries
                .remove_if(&index, |_, entry| entry.last_used() == generation)
                .is_some()
            {
                evicted += 1;
            }
        }

        self.evictions.fetch_add(evicted as u64, Ordering::Relaxed);
        debug!(
            evicted,
            before = len,
            after = self.entries.len(),
            min,
            max,
            "Tile cache compacted"
        );
        evicted
    }

    /// Point-in-time cache statistics.
    pub fn stats(&self) -> CacheStats {
        let (min_entries, max_entries) = self.target_occupancy();
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            insertions: self.insertions.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            entries: self.entries.len(),
            min_entries,
            max_entries,
        }
    }
}
