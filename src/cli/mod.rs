//! CLI interface for opt-engine
//!
//! Provides subcommands for:
//! - `run`: Start a paper trading session
//! - `replay`: Rebuild risk counters from the trade journal
//! - `status`: Show current state
//! - `config`: Show configuration

mod replay;
mod run;

pub use replay::ReplayArgs;
pub use run::RunArgs;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "opt-engine")]
#[command(about = "Order execution and risk management engine for automated options trading")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start a paper trading session
    Run(RunArgs),
    /// Rebuild risk counters from the trade journal
    Replay(ReplayArgs),
    /// Show current state
    Status,
    /// Show configuration
    Config,
}
