//! CLI interface for lob-replay
//!
//! Provides subcommands for:
//! - `backtest`: Replay a recorded stream against the simulator
//! - `sweep`: Run a parameter sweep of independent backtests
//! - `config`: Show the effective configuration

mod backtest;
mod sweep;

pub use backtest::BacktestArgs;
pub use sweep::SweepArgs;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "lob-replay")]
#[command(about = "Event-driven limit order book backtester with latency and queue simulation")]
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
    /// Replay a recorded stream against the simulator
    Backtest(BacktestArgs),
    /// Run a parameter sweep of independent backtests
    Sweep(SweepArgs),
    /// Show the effective configuration
    Config,
}
