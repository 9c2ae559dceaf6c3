//! Configuration errors.

use std::path::PathBuf;

use thiserror::Error;

/// Errors from loading, validating or saving a [`FetchConfig`](super::FetchConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read or is not valid INI
    #[error("Failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: ini::Error,
    },

    /// INI text could not be parsed
    #[error("Failed to parse config: {0}")]
    Parse(#[from] ini::ParseError),

    #[error("Failed to write config file: {0}")]
    Write(#[from] std::io::Error),

    /// A value is malformed or out of range
    #[error("Invalid configuration: {section}.{key} = '{value}' - {reason}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
        reason: String,
    },
}

impl ConfigError {
    pub(super) fn invalid(
        section: &str,
        key: &str,
        value: impl ToString,
        reason: impl Into<String>,
    ) -> Self {
        ConfigError::InvalidValue {
            section: section.to_string(),
            key: key.to_string(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}
