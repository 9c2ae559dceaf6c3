//! `tilefetch config`: show or write the effective configuration.

use std::path::PathBuf;

use clap::Args;

use super::load_config;
use crate::error::CliError;

#[derive(Debug, Args)]
pub struct ConfigArgs {
    /// INI file to load instead of the built-in defaults
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Write the configuration to this file instead of printing it
    #[arg(long)]
    pub output: Option<PathBuf>,
}

pub fn run(args: ConfigArgs) -> Result<(), CliError> {
    let config = load_config(args.config.as_deref())?;

    match args.output {
        Some(path) => {
            config.save_to(&path)?;
            println!("Configuration written to {}", path.display());
        }
        None => print!("{}", config.to_ini_string()),
    }
    Ok(())
}
