//! `FetchConfig` and its defaults.

use std::path::Path;
use std::sync::Arc;

use ini::Ini;

use super::{parser, writer, ConfigError};
use crate::cache::OccupancyPolicy;
use crate::fetch::DEFAULT_MAX_TILES_PER_UPDATE;
use crate::strategy::{FetchStrategy, LevelsUpFetchStrategy, MinimalFetchStrategy};

// =============================================================================
// Defaults
// =============================================================================

/// Default number of worker tasks.
pub const DEFAULT_WORKER_COUNT: usize = 4;

/// Default number of fetches the planner aims to keep running.
pub const DEFAULT_DESIRED_CONCURRENCY: usize = 4;

/// Default hard cap on tiles in flight, enforced by the tracker.
pub const DEFAULT_MAX_IN_PROGRESS: usize = 4;

/// Default capacity of the event broadcast channel.
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Default number of coarser fallback levels. Zero selects the minimal
/// strategy.
pub const DEFAULT_MAX_LEVELS_UP: u8 = 0;

/// Default margin around the viewport, in percent per side.
pub const DEFAULT_MARGIN_PERCENT: f64 = 0.0;

/// Tunables for the fetch engine.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchConfig {
    // ==================== Workers ====================
    /// Worker tasks pulling jobs from the planner.
    ///
    /// Default: 4.
    pub worker_count: usize,

    /// Fetches the planner tries to keep running at once.
    ///
    /// Jobs are only handed out while fewer than this many are active.
    /// Default: 4.
    pub desired_concurrency: usize,

    /// Hard cap on tiles in flight.
    ///
    /// Enforced by the tracker regardless of how callers schedule jobs.
    /// Default: 4.
    pub max_in_progress: usize,

    // ==================== Planning ====================
    /// Safety cap on tiles requested by one viewport recomputation.
    ///
    /// Longer strategy outputs are truncated with a warning. Default: 1024.
    pub max_tiles_per_update: usize,

    /// Capacity of the event broadcast channel.
    ///
    /// Slow subscribers lag past this many events. Default: 256.
    pub event_capacity: usize,

    // ==================== Cache ====================
    /// Cache target occupancy relative to the viewport's needed tiles.
    ///
    /// Default: needed + 50 .. needed + 100.
    pub occupancy: OccupancyPolicy,

    // ==================== Strategy ====================
    /// Coarser levels fetched behind the target level.
    ///
    /// Default: 0 (target level only).
    pub max_levels_up: u8,

    /// Margin around the viewport, in percent of width/height per side.
    ///
    /// Default: 0.
    pub margin_percent: f64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            worker_count: DEFAULT_WORKER_COUNT,
            desired_concurrency: DEFAULT_DESIRED_CONCURRENCY,
            max_in_progress: DEFAULT_MAX_IN_PROGRESS,
            max_tiles_per_update: DEFAULT_MAX_TILES_PER_UPDATE,
            event_capacity: DEFAULT_EVENT_CAPACITY,
            occupancy: OccupancyPolicy::default(),
            max_levels_up: DEFAULT_MAX_LEVELS_UP,
            margin_percent: DEFAULT_MARGIN_PERCENT,
        }
    }
}

impl FetchConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_worker_count(mut self, count: usize) -> Self {
        self.worker_count = count;
        self
    }

    pub fn with_desired_concurrency(mut self, concurrency: usize) -> Self {
        self.desired_concurrency = concurrency;
        self
    }

    pub fn with_max_in_progress(mut self, max: usize) -> Self {
        self.max_in_progress = max;
        self
    }

    pub fn with_max_tiles_per_update(mut self, max: usize) -> Self {
        self.max_tiles_per_update = max;
        self
    }

    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity;
        self
    }

    pub fn with_occupancy(mut self, occupancy: OccupancyPolicy) -> Self {
        self.occupancy = occupancy;
        self
    }

    pub fn with_max_levels_up(mut self, levels: u8) -> Self {
        self.max_levels_up = levels;
        self
    }

    pub fn with_margin_percent(mut self, percent: f64) -> Self {
        self.margin_percent = percent;
        self
    }

    /// Check that every value is usable.
    ///
    /// Nothing is clamped silently: zero-sized pools, queues or channels and
    /// an inverted occupancy range are rejected.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("fetch", "workers", self.worker_count),
            ("fetch", "desired_concurrency", self.desired_concurrency),
            ("fetch", "max_in_progress", self.max_in_progress),
            ("fetch", "max_tiles_per_update", self.max_tiles_per_update),
            ("fetch", "event_capacity", self.event_capacity),
        ];
        for (section, key, value) in positive {
            if value == 0 {
                return Err(ConfigError::invalid(
                    section,
                    key,
                    value,
                    "must be greater than zero",
                ));
            }
        }

        if self.occupancy.max_extra < self.occupancy.min_extra {
            return Err(ConfigError::invalid(
                "cache",
                "max_extra",
                self.occupancy.max_extra,
                format!("must be at least min_extra ({})", self.occupancy.min_extra),
            ));
        }

        if !self.margin_percent.is_finite() || self.margin_percent < 0.0 {
            return Err(ConfigError::invalid(
                "strategy",
                "margin_percent",
                self.margin_percent,
                "must be a non-negative number",
            ));
        }

        Ok(())
    }

    /// Build the configured fetch strategy.
    pub fn strategy(&self) -> Arc<dyn FetchStrategy> {
        if self.max_levels_up == 0 && self.margin_percent == 0.0 {
            Arc::new(MinimalFetchStrategy)
        } else {
            Arc::new(
                LevelsUpFetchStrategy::new(self.max_levels_up)
                    .with_margin_percent(self.margin_percent),
            )
        }
    }

    // =========================================================================
    // INI
    // =========================================================================

    /// Load and validate a configuration file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let ini = Ini::load_from_file(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = parser::parse_ini(&ini)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate INI text.
    pub fn from_ini_str(text: &str) -> Result<Self, ConfigError> {
        let ini = Ini::load_from_str(text)?;
        let config = parser::parse_ini(&ini)?;
        config.validate()?;
        Ok(config)
    }

    /// Render as commented INI text that [`from_ini_str`](Self::from_ini_str)
    /// reads back.
    pub fn to_ini_string(&self) -> String {
        writer::to_ini_string(self)
    }

    /// Write the configuration to `path`, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_ini_string())?;
        Ok(())
    }
}
