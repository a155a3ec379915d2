//! Summary statistics and report output

use super::aggregator::EquityPoint;
use crate::sim::{Fill, Position};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Trading seconds per year used to annualize per-tick returns.
const SECONDS_PER_YEAR: f64 = 252.0 * 24.0 * 3600.0;

/// Summary statistics for one run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BacktestSummary {
    /// Total P&L net of fees
    pub net_pnl: f64,
    /// Net P&L as a fraction of initial capital
    pub net_pnl_pct: f64,
    /// Annualized Sharpe ratio of per-tick equity returns
    pub sharpe_ratio: f64,
    /// Largest peak-to-trough equity loss
    pub max_drawdown: f64,
    /// Drawdown as a fraction of the peak
    pub max_drawdown_pct: f64,
    /// Fraction of ticks with positive equity change
    pub win_rate: f64,
    /// Gross traded notional
    pub turnover: f64,
    pub total_fills: usize,
    pub maker_fills: usize,
    pub orders_submitted: u64,
    pub orders_cancelled: u64,
    pub orders_rejected: u64,
    pub fees_paid: f64,
    pub final_inventory: f64,
    pub ticks: usize,
}

impl BacktestSummary {
    /// Format as a table for CLI output.
    pub fn format_table(&self) -> String {
        format!(
            r#"
══════════════════════════════════════════════════════
               BACKTEST RESULTS
══════════════════════════════════════════════════════

PERFORMANCE
───────────────────────────────────────────────────────
Net P&L:          {:+.2} ({:+.4}%)
Sharpe Ratio:     {:.2}
Max Drawdown:     {:.2} ({:.4}%)
Win Rate:         {:.1}%
Turnover:         {:.2}
Fees Paid:        {:.2}

ACTIVITY
───────────────────────────────────────────────────────
Fills:            {} ({} maker)
Orders Submitted: {}
Orders Cancelled: {}
Orders Rejected:  {}
Final Inventory:  {:+.4}
Ticks:            {}
══════════════════════════════════════════════════════
"#,
            self.net_pnl,
            self.net_pnl_pct * 100.0,
            self.sharpe_ratio,
            self.max_drawdown,
            self.max_drawdown_pct * 100.0,
            self.win_rate * 100.0,
            self.turnover,
            self.fees_paid,
            self.total_fills,
            self.maker_fills,
            self.orders_submitted,
            self.orders_cancelled,
            self.orders_rejected,
            self.final_inventory,
            self.ticks,
        )
    }
}

/// Complete results of one run, serializable for external rendering.
#[derive(Debug, Clone, Serialize)]
pub struct BacktestResult {
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    /// False when the run aborted mid-replay; metrics cover the replayed
    /// prefix only
    pub complete: bool,
    pub error: Option<String>,
    pub summary: BacktestSummary,
    pub equity: Vec<EquityPoint>,
    pub fills: Vec<Fill>,
}

impl BacktestResult {
    /// Write the full report as JSON, returning the path.
    pub fn write_report(&self, dir: &Path) -> anyhow::Result<PathBuf> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(format!(
            "report_{}.json",
            self.generated_at.format("%Y%m%d_%H%M%S")
        ));
        std::fs::write(&path, serde_json::to_vec_pretty(self)?)?;
        Ok(path)
    }

    /// Write just the equity curve for the external visualizer.
    pub fn write_equity_curve(&self, dir: &Path) -> anyhow::Result<PathBuf> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(format!(
            "equity_{}.json",
            self.generated_at.format("%Y%m%d_%H%M%S")
        ));
        std::fs::write(&path, serde_json::to_vec_pretty(&self.equity)?)?;
        Ok(path)
    }
}

/// Compute summary statistics from the collected samples.
#[allow(clippy::too_many_arguments)]
pub(super) fn summarize(
    initial_capital: f64,
    tick_interval_ns: i64,
    equity: &[EquityPoint],
    fills: &[Fill],
    orders_submitted: u64,
    orders_cancelled: u64,
    orders_rejected: u64,
    position: &Position,
) -> BacktestSummary {
    let net_pnl = equity
        .last()
        .map(|p| p.equity - initial_capital)
        .unwrap_or(0.0);

    let returns: Vec<f64> = equity
        .windows(2)
        .map(|w| (w[1].equity - w[0].equity) / w[0].equity)
        .collect();

    let sharpe_ratio = if returns.len() > 1 {
        let n = returns.len() as f64;
        let mean = returns.iter().sum::<f64>() / n;
        let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n;
        let std_dev = variance.sqrt();
        if std_dev > 0.0 {
            let steps_per_year = SECONDS_PER_YEAR * 1e9 / tick_interval_ns as f64;
            mean / std_dev * steps_per_year.sqrt()
        } else {
            0.0
        }
    } else {
        0.0
    };

    let mut peak = f64::MIN;
    let mut max_drawdown = 0.0f64;
    let mut max_drawdown_pct = 0.0f64;
    for point in equity {
        peak = peak.max(point.equity);
        let drawdown = peak - point.equity;
        if drawdown > max_drawdown {
            max_drawdown = drawdown;
            max_drawdown_pct = if peak.abs() > 0.0 { drawdown / peak } else { 0.0 };
        }
    }

    let wins = returns.iter().filter(|r| **r > 0.0).count();
    let win_rate = if returns.is_empty() {
        0.0
    } else {
        wins as f64 / returns.len() as f64
    };

    BacktestSummary {
        net_pnl,
        net_pnl_pct: if initial_capital > 0.0 {
            net_pnl / initial_capital
        } else {
            0.0
        },
        sharpe_ratio,
        max_drawdown,
        max_drawdown_pct,
        win_rate,
        turnover: fills.iter().map(Fill::notional).sum(),
        total_fills: fills.len(),
        maker_fills: fills.iter().filter(|f| f.maker).count(),
        orders_submitted,
        orders_cancelled,
        orders_rejected,
        fees_paid: position.fees_paid,
        final_inventory: position.qty,
        ticks: equity.len(),
    }
}
