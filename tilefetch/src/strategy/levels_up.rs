//! Multi-level fetch strategy with coarse fallbacks.
//!
//! While the precise level is still loading, a renderer can draw the
//! matching tiles of a coarser level scaled up. This strategy requests the
//! target level first and then each coarser level in turn, so the fallback
//! tiles arrive right behind the precise ones.

use super::{nearest_first, FetchStrategy};
use crate::tile::{Extent, Level, TileRequest, TileSchema};

/// Default number of coarser levels requested behind the target level.
pub const DEFAULT_MAX_LEVELS_UP: u8 = 2;

/// Fetches the target level plus up to `max_levels_up` coarser levels.
///
/// The extent can be grown by a margin (in percent of width/height per
/// side) to warm tiles just outside the visible area.
///
/// # Ordering
///
/// ```text
/// [target level, nearest first] [target+1 coarser, nearest first] ...
/// ```
#[derive(Debug, Clone, Copy)]
pub struct LevelsUpFetchStrategy {
    max_levels_up: u8,
    margin_percent: f64,
}

impl Default for LevelsUpFetchStrategy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_LEVELS_UP)
    }
}

impl LevelsUpFetchStrategy {
    /// Create a strategy that adds up to `max_levels_up` coarser levels.
    pub fn new(max_levels_up: u8) -> Self {
        Self {
            max_levels_up,
            margin_percent: 0.0,
        }
    }

    /// Expand the requested extent by `percent` on every side.
    pub fn with_margin_percent(mut self, percent: f64) -> Self {
        self.margin_percent = percent.max(0.0);
        self
    }

    /// Maximum number of coarser levels requested.
    pub fn max_levels_up(&self) -> u8 {
        self.max_levels_up
    }

    /// Margin applied around the requested extent, in percent.
    pub fn margin_percent(&self) -> f64 {
        self.margin_percent
    }

    /// Levels coarser than `target`, least coarse first, capped.
    fn fallback_levels(&self, schema: &dyn TileSchema, target: &Level) -> Vec<Level> {
        let mut coarser: Vec<Level> = schema
            .levels()
            .into_iter()
            .filter(|level| level.units_per_pixel > target.units_per_pixel)
            .collect();
        coarser.sort_by(|a, b| a.units_per_pixel.total_cmp(&b.units_per_pixel));
        coarser.truncate(self.max_levels_up as usize);
        coarser
    }
}

impl FetchStrategy for LevelsUpFetchStrategy {
    fn get(&self, schema: &dyn TileSchema, extent: &Extent, level: u8) -> Vec<TileRequest> {
        if extent.is_empty() {
            return Vec::new();
        }
        let Some(target) = schema.level(level) else {
            return Vec::new();
        };

        let extent = extent.expand_by_percent(self.margin_percent);
        let mut requests = nearest_first(schema, &extent, target.id);
        for fallback in self.fallback_levels(schema, &target) {
            requests.extend(nearest_first(schema, &extent, fallback.id));
        }
        requests
    }

    fn name(&self) -> &'static str {
        "levels-up"
    }
}
