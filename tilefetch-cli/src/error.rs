//! CLI error handling with user-friendly messages.

use std::process;

use thiserror::Error;
use tilefetch::config::ConfigError;

/// Errors surfaced to the user by the `tilefetch` binary.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Failed to initialize logging: {0}")]
    LoggingInit(std::io::Error),

    #[error("Failed to create Tokio runtime: {0}")]
    RuntimeCreation(std::io::Error),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Simulation did not settle within {0:?}")]
    Timeout(std::time::Duration),
}

impl CliError {
    /// Print the error and exit with status 1.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        if let CliError::Config(ConfigError::InvalidValue { .. }) = self {
            eprintln!();
            eprintln!("Run 'tilefetch config' to see every key with its default.");
        }

        process::exit(1)
    }
}
