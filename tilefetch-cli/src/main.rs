//! TileFetch CLI - drive the tile fetch engine from the command line.
//!
//! - `tilefetch simulate` runs the planner and worker pool against a
//!   synthetic tile source while panning a virtual viewport
//! - `tilefetch config` prints the effective configuration

mod commands;
mod error;

use clap::{Parser, Subcommand};

use commands::config::ConfigArgs;
use commands::simulate::SimulateArgs;

#[derive(Parser)]
#[command(name = "tilefetch")]
#[command(version, about = "Viewport-driven tile fetch planning engine", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Pan a virtual viewport over a synthetic tile source and report telemetry
    Simulate(SimulateArgs),

    /// Print the effective configuration as INI
    Config(ConfigArgs),
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Simulate(args) => commands::simulate::run(args),
        Commands::Config(args) => commands::config::run(args),
    };

    if let Err(e) = result {
        e.exit();
    }
}
