//! Cache statistics.

use std::fmt;

/// Point-in-time counters of a [`TileCache`](super::TileCache).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub insertions: u64,
    pub evictions: u64,
    /// Entries currently held
    pub entries: usize,
    pub min_entries: usize,
    pub max_entries: usize,
}

impl CacheStats {
    /// Fraction of lookups that hit, `0.0` when there were none.
    pub fn hit_rate(&self) -> f64 {
        let lookups = self.hits + self.misses;
        if lookups == 0 {
            0.0
        } else {
            self.hits as f64 / lookups as f64
        }
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} entries (target {}..{}), {:.1}% hit rate, {} evicted",
            self.entries,
            self.min_entries,
            self.max_entries,
            self.hit_rate() * 100.0,
            self.evictions
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_rate() {
        let stats = CacheStats {
            hits: 3,
            misses: 1,
            ..Default::default()
        };
        assert!((stats.hit_rate() - 0.75).abs() < f64::EPSILON);
    }

    #[test]
    fn test_hit_rate_no_lookups() {
        assert_eq!(CacheStats::default().hit_rate(), 0.0);
    }

    #[test]
    fn test_display() {
        let stats = CacheStats {
            hits: 1,
            misses: 1,
            evictions: 4,
            entries: 12,
            min_entries: 50,
            max_entries: 100,
            ..Default::default()
        };
        assert_eq!(
            stats.to_string(),
            "12 entries (target 50..100), 50.0% hit rate, 4 evicted"
        );
    }
}
