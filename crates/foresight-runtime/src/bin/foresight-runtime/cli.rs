//! CLI definitions for foresight-runtime.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "foresight-runtime",
    version,
    about = "OPC UA tag forecasting session CLI",
    infer_subcommands = true,
    arg_required_else_help = false,
    after_help = "Examples:\n  foresight-runtime                          # run a session with defaults\n  foresight-runtime run --config session.toml\n  foresight-runtime run --tag Pressure.LineA --ticks 3\n  foresight-runtime tags                     # list tags and models"
)]
pub struct Cli {
    /// Show verbose startup details.
    #[arg(long, short, global = true)]
    pub verbose: bool,
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run one forecasting session: connect, train, predict, stop.
    Run {
        /// Session configuration file (TOML).
        #[arg(long)]
        config: Option<PathBuf>,
        /// Server endpoint override.
        #[arg(long)]
        endpoint: Option<String>,
        /// Target tag override (see `tags`).
        #[arg(long)]
        tag: Option<String>,
        /// Forecast model override (see `tags`).
        #[arg(long)]
        model: Option<String>,
        /// Seed for the simulated backends (replayable runs).
        #[arg(long)]
        seed: Option<u64>,
        /// Prediction ticks to run before stopping.
        #[arg(long, default_value = "6")]
        ticks: u64,
    },
    /// List the available tags and forecast models.
    Tags,
}
