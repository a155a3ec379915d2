//! Backtest command implementation

use crate::config::Config;
use crate::sim::{latency_from_config, Backtester};
use crate::strategy::MarketMaker;
use clap::Args;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct BacktestArgs {
    /// Market data file (fixed-width event records)
    pub data_file: PathBuf,

    /// Initial book snapshot file
    #[arg(short = 's', long)]
    pub snapshot: Option<PathBuf>,

    /// Skip writing the equity curve for the external visualizer
    #[arg(long)]
    pub no_viz: bool,

    /// Write the full report JSON
    #[arg(long)]
    pub save: bool,

    /// Override the exchange ack latency in ms
    #[arg(long)]
    pub latency: Option<u64>,

    /// Output directory for reports
    #[arg(long, default_value = "./reports")]
    pub output: PathBuf,
}

impl BacktestArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let mut config = config.clone();
        if let Some(latency_ms) = self.latency {
            config.latency.ack_ns = (latency_ms as i64) * 1_000_000;
        }
        config.validate()?;

        tracing::info!(data = %self.data_file.display(), "starting backtest");
        let strategy = MarketMaker::new(config.quoting.clone(), config.instrument.tick_size);
        let latency = latency_from_config(&config.latency);
        let backtester = Backtester::new(
            &config,
            &self.data_file,
            self.snapshot.as_deref(),
            strategy,
            latency,
        )?;

        let result = tokio::task::block_in_place(|| backtester.run());

        println!("{}", result.summary.format_table());
        if !self.no_viz {
            let path = result.write_equity_curve(&self.output)?;
            tracing::info!(path = %path.display(), "wrote equity curve");
        }
        if self.save {
            let path = result.write_report(&self.output)?;
            tracing::info!(path = %path.display(), "wrote report");
        }

        if let Some(reason) = &result.error {
            anyhow::bail!("backtest aborted: {reason}");
        }
        Ok(())
    }
}
