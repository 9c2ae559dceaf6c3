//! INI parsing for `FetchConfig`.
//!
//! The single place where INI key names map to config fields.

use std::str::FromStr;

use ini::{Ini, Properties};

use super::{ConfigError, FetchConfig};

/// Overlay the values found in `ini` onto the defaults.
///
/// Only parses; range checks happen in [`FetchConfig::validate`].
pub(super) fn parse_ini(ini: &Ini) -> Result<FetchConfig, ConfigError> {
    let mut config = FetchConfig::default();

    // [fetch] section
    if let Some(section) = ini.section(Some("fetch")) {
        let fetch = Section::new("fetch", section);
        fetch.read("workers", &mut config.worker_count, "must be a positive integer")?;
        fetch.read(
            "desired_concurrency",
            &mut config.desired_concurrency,
            "must be a positive integer",
        )?;
        fetch.read(
            "max_in_progress",
            &mut config.max_in_progress,
            "must be a positive integer",
        )?;
        fetch.read(
            "max_tiles_per_update",
            &mut config.max_tiles_per_update,
            "must be a positive integer",
        )?;
        fetch.read(
            "event_capacity",
            &mut config.event_capacity,
            "must be a positive integer",
        )?;
    }

    // [cache] section
    if let Some(section) = ini.section(Some("cache")) {
        let cache = Section::new("cache", section);
        cache.read(
            "min_extra",
            &mut config.occupancy.min_extra,
            "must be a non-negative integer (tiles)",
        )?;
        cache.read(
            "max_extra",
            &mut config.occupancy.max_extra,
            "must be a non-negative integer (tiles)",
        )?;
    }

    // [strategy] section
    if let Some(section) = ini.section(Some("strategy")) {
        let strategy = Section::new("strategy", section);
        strategy.read(
            "max_levels_up",
            &mut config.max_levels_up,
            "must be an integer between 0 and 255",
        )?;
        strategy.read(
            "margin_percent",
            &mut config.margin_percent,
            "must be a number (percent per side)",
        )?;
    }

    Ok(config)
}

/// Named view of one INI section.
struct Section<'a> {
    name: &'static str,
    properties: &'a Properties,
}

impl<'a> Section<'a> {
    fn new(name: &'static str, properties: &'a Properties) -> Self {
        Self { name, properties }
    }

    /// Parse `key` into `target` if present; leave `target` alone otherwise.
    fn read<T: FromStr>(&self, key: &str, target: &mut T, reason: &str) -> Result<(), ConfigError> {
        if let Some(raw) = self.properties.get(key) {
            let value = raw.trim();
            *target = value
                .parse()
                .map_err(|_| ConfigError::invalid(self.name, key, value, reason))?;
        }
        Ok(())
    }
}
