//! conjscreen - batch orbit propagation and conjunction screening
//!
//! `propagate` turns an element-set catalog into per-object trajectory
//! files; `detect` screens a primary trajectory directory against a hazard
//! directory and writes risk-tiered event files.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{run_detect, run_propagate, DetectArgs, PropagateArgs};

#[derive(Parser, Debug)]
#[command(name = "conjscreen")]
#[command(about = "Propagate TLE catalogs and screen them for close approaches")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Propagate element sets into trajectory files
    Propagate(PropagateArgs),
    /// Screen primary trajectories against hazard trajectories
    Detect(DetectArgs),
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match cli.command {
        Command::Propagate(args) => run_propagate(args),
        Command::Detect(args) => run_detect(args),
    }
}
