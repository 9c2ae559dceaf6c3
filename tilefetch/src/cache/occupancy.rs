//! Cache occupancy policy.

/// Default entries kept beyond the viewport's needs after a compaction.
pub const DEFAULT_MIN_EXTRA: usize = 50;

/// Default entries allowed beyond the viewport's needs before compaction.
pub const DEFAULT_MAX_EXTRA: usize = 100;

/// Derives the cache's target occupancy from the number of tiles the
/// current viewport needs.
///
/// The slack above the needed count keeps recently viewed tiles around, so
/// small pans back and forth do not flicker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OccupancyPolicy {
    /// Entries kept beyond the needed count
    pub min_extra: usize,
    /// Entries allowed beyond the needed count
    pub max_extra: usize,
}

impl Default for OccupancyPolicy {
    fn default() -> Self {
        Self {
            min_extra: DEFAULT_MIN_EXTRA,
            max_extra: DEFAULT_MAX_EXTRA,
        }
    }
}

impl OccupancyPolicy {
    pub fn new(min_extra: usize, max_extra: usize) -> Self {
        Self {
            min_extra,
            max_extra,
        }
    }

    /// `(min, max)` occupancy for a viewport needing `needed` tiles.
    pub fn targets(&self, needed: usize) -> (usize, usize) {
        let min = needed.saturating_add(self.min_extra);
        let max = needed.saturating_add(self.max_extra).max(min);
        (min, max)
    }
}
