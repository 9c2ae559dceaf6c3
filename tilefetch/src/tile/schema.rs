//! Tile schema abstraction.
//!
//! A schema describes the tile pyramid a source serves: which resolution
//! levels exist, how large each level's tile matrix is, and which tiles
//! cover a given extent. The fetch engine treats it as read-only and
//! externally owned; projections and real-world grid math stay outside.
//!
//! [`GridSchema`] is a minimal regular-grid implementation (top-left origin,
//! square tiles) used by the CLI simulator and by tests.

use super::{Extent, TileIndex};

/// Half the circumference of the Web Mercator world in meters.
const WEB_MERCATOR_HALF_WORLD: f64 = 20_037_508.342_789_244;

/// Default tile edge length in pixels.
pub const DEFAULT_TILE_SIZE: u32 = 256;

/// One resolution level of a tile schema.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Level {
    /// Level identifier (zoom level for pyramid schemas)
    pub id: u8,
    /// Map units covered by one pixel at this level
    pub units_per_pixel: f64,
}

impl Level {
    pub const fn new(id: u8, units_per_pixel: f64) -> Self {
        Self {
            id,
            units_per_pixel,
        }
    }
}

/// Describes the tile pyramid of a source.
///
/// Implementations must be `Send + Sync`: the planner consults the schema
/// from whichever worker thread happens to trigger a recomputation.
pub trait TileSchema: Send + Sync {
    /// All resolution levels offered by the schema.
    fn levels(&self) -> Vec<Level>;

    /// Width and height of the tile matrix at a level, in tiles.
    ///
    /// Returns `None` for unknown levels.
    fn matrix_size(&self, level: u8) -> Option<(u32, u32)>;

    /// Map extent covered by a tile.
    ///
    /// Returns `None` if the index lies outside the schema.
    fn tile_extent(&self, index: TileIndex) -> Option<Extent>;

    /// Tiles at `level` that intersect `extent`, in row-major order.
    ///
    /// Empty extents and unknown levels yield an empty list.
    fn tiles_in_extent(&self, extent: &Extent, level: u8) -> Vec<TileIndex>;

    /// Look up a level by identifier.
    fn level(&self, id: u8) -> Option<Level> {
        self.levels().into_iter().find(|level| level.id == id)
    }
}

/// Pick the level whose resolution is closest to `resolution`.
///
/// Ties go to the finer level (smaller units-per-pixel) so the viewport never
/// renders blurrier than it has to. Returns `None` when there are no levels
/// or the resolution is not a finite number.
pub fn nearest_level(levels: &[Level], resolution: f64) -> Option<Level> {
    if !resolution.is_finite() {
        return None;
    }

    let mut best: Option<Level> = None;
    for level in levels {
        let distance = (level.units_per_pixel - resolution).abs();
        best = match best {
            None => Some(*level),
            Some(current) => {
                let current_distance = (current.units_per_pixel - resolution).abs();
                if distance < current_distance
                    || (distance == current_distance
                        && level.units_per_pixel < current.units_per_pixel)
                {
                    Some(*level)
                } else {
                    Some(current)
                }
            }
        };
    }
    best
}

/// Regular tile grid with a top-left origin.
///
/// Every level covers the same `bounds`; tile edge length in map units is
/// `tile_size * units_per_pixel`. Matrix dimensions are rounded up so that
/// partial tiles at the right/bottom edge are still addressable.
#[derive(Debug, Clone)]
pub struct GridSchema {
    bounds: Extent,
    tile_size: u32,
    levels: Vec<Level>,
}

impl GridSchema {
    /// Create a grid schema.
    ///
    /// Levels are kept in the order given; identifiers are expected to be
    /// unique.
    pub fn new(bounds: Extent, tile_size: u32, levels: Vec<Level>) -> Self {
        Self {
            bounds,
            tile_size: tile_size.max(1),
            levels,
        }
    }

    /// Global spherical-mercator pyramid with levels `0..=max_level`.
    ///
    /// Level 0 is a single 256px tile covering the whole world.
    pub fn web_mercator(max_level: u8) -> Self {
        let world = Extent::new(
            -WEB_MERCATOR_HALF_WORLD,
            -WEB_MERCATOR_HALF_WORLD,
            WEB_MERCATOR_HALF_WORLD,
            WEB_MERCATOR_HALF_WORLD,
        );
        let base = world.width() / DEFAULT_TILE_SIZE as f64;
        let levels = (0..=max_level)
            .map(|z| Level::new(z, base / 2f64.powi(z as i32)))
            .collect();
        Self::new(world, DEFAULT_TILE_SIZE, levels)
    }

    /// Full extent covered by the grid.
    pub fn bounds(&self) -> &Extent {
        &self.bounds
    }

    /// Tile edge length in pixels.
    pub fn tile_size(&self) -> u32 {
        self.tile_size
    }

    /// Tile edge length in map units at a level.
    fn tile_span(&self, level: &Level) -> f64 {
        self.tile_size as f64 * level.units_per_pixel
    }
}

impl TileSchema for GridSchema {
    fn levels(&self) -> Vec<Level> {
        self.levels.clone()
    }

    fn level(&self, id: u8) -> Option<Level> {
        self.levels.iter().copied().find(|level| level.id == id)
    }

    fn matrix_size(&self, level: u8) -> Option<(u32, u32)> {
        let level = self.level(level)?;
        let span = self.tile_span(&level);
        if span <= 0.0 || !span.is_finite() || self.bounds.is_empty() {
            return Some((0, 0));
        }
        let width = (self.bounds.width() / span).ceil() as u32;
        let height = (self.bounds.height() / span).ceil() as u32;
        Some((width, height))
    }

    fn tile_extent(&self, index: TileIndex) -> Option<Extent> {
        let level = self.level(index.level)?;
        let (width, height) = self.matrix_size(index.level)?;
        if index.col >= width || index.row >= height {
            return None;
        }
        let span = self.tile_span(&level);
        let min_x = self.bounds.min_x + index.col as f64 * span;
        let max_y = self.bounds.max_y - index.row as f64 * span;
        Some(Extent::new(min_x, max_y - span, min_x + span, max_y))
    }

    fn tiles_in_extent(&self, extent: &Extent, level: u8) -> Vec<TileIndex> {
        let Some(level_info) = self.level(level) else {
            return Vec::new();
        };
        let Some((width, height)) = self.matrix_size(level) else {
            return Vec::new();
        };
        if extent.is_empty() || width == 0 || height == 0 || !extent.intersects(&self.bounds) {
            return Vec::new();
        }

        let span = self.tile_span(&level_info);
        let clipped = Extent::new(
            extent.min_x.max(self.bounds.min_x),
            extent.min_y.max(self.bounds.min_y),
            extent.max_x.min(self.bounds.max_x),
            extent.max_y.min(self.bounds.max_y),
        );

        let first_col = ((clipped.min_x - self.bounds.min_x) / span).floor().max(0.0) as u32;
        let last_col = (((clipped.max_x - self.bounds.min_x) / span).ceil() as u32)
            .saturating_sub(1)
            .min(width - 1);
        let first_row = ((self.bounds.max_y - clipped.max_y) / span).floor().max(0.0) as u32;
        let last_row = (((self.bounds.max_y - clipped.min_y) / span).ceil() as u32)
            .saturating_sub(1)
            .min(height - 1);

        let mut tiles = Vec::new();
        for row in first_row..=last_row {
            for col in first_col..=last_col {
                tiles.push(TileIndex::new(col, row, level));
            }
        }
        tiles
    }
}
