//! CLI subcommands.

pub mod config;
pub mod simulate;

use std::path::Path;

use tilefetch::config::FetchConfig;

use crate::error::CliError;

/// Load `path` if given, defaults otherwise.
pub fn load_config(path: Option<&Path>) -> Result<FetchConfig, CliError> {
    match path {
        Some(path) => Ok(FetchConfig::load(path)?),
        None => Ok(FetchConfig::default()),
    }
}
