//! Parameter sweep command
//!
//! Independent backtests are embarrassingly parallel: each run owns its
//! whole simulation state, so they execute concurrently on blocking tasks.

use crate::config::Config;
use crate::metrics::BacktestSummary;
use crate::sim::{latency_from_config, Backtester};
use crate::strategy::MarketMaker;
use clap::Args;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct SweepArgs {
    /// Market data file (fixed-width event records)
    pub data_file: PathBuf,

    /// Initial book snapshot file
    #[arg(short = 's', long)]
    pub snapshot: Option<PathBuf>,

    /// Comma-separated risk-aversion values to sweep
    #[arg(long, default_value = "0.05,0.1,0.2")]
    pub gammas: String,
}

impl SweepArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let gammas = self
            .gammas
            .split(',')
            .map(|s| s.trim().parse::<f64>())
            .collect::<Result<Vec<f64>, _>>()
            .map_err(|e| anyhow::anyhow!("invalid --gammas list: {e}"))?;
        if gammas.is_empty() {
            anyhow::bail!("--gammas list is empty");
        }

        let mut tasks = tokio::task::JoinSet::new();
        for gamma in gammas {
            let mut run_config = config.clone();
            run_config.quoting.gamma = gamma;
            run_config.validate()?;
            let data_file = self.data_file.clone();
            let snapshot = self.snapshot.clone();

            tasks.spawn_blocking(move || -> anyhow::Result<(f64, BacktestSummary)> {
                let strategy = MarketMaker::new(
                    run_config.quoting.clone(),
                    run_config.instrument.tick_size,
                );
                let latency = latency_from_config(&run_config.latency);
                let backtester = Backtester::new(
                    &run_config,
                    &data_file,
                    snapshot.as_deref(),
                    strategy,
                    latency,
                )?;
                let result = backtester.run();
                if let Some(reason) = result.error {
                    anyhow::bail!("run with gamma={gamma} aborted: {reason}");
                }
                Ok((gamma, result.summary))
            });
        }

        let mut rows = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            rows.push(joined??);
        }
        rows.sort_by(|a, b| a.0.total_cmp(&b.0));

        println!("\n{:>8}  {:>12}  {:>8}  {:>10}  {:>8}", "gamma", "net_pnl", "sharpe", "max_dd", "fills");
        println!("{}", "─".repeat(56));
        for (gamma, summary) in rows {
            println!(
                "{:>8.3}  {:>+12.2}  {:>8.2}  {:>10.2}  {:>8}",
                gamma,
                summary.net_pnl,
                summary.sharpe_ratio,
                summary.max_drawdown,
                summary.total_fills,
            );
        }
        Ok(())
    }
}
