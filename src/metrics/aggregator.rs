//! Per-run metric accumulation

use super::report::{summarize, BacktestResult};
use crate::data::Nanos;
use crate::sim::{Fill, Position};
use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

/// One equity-curve sample, taken at each strategy tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EquityPoint {
    pub ts: Nanos,
    pub realized: f64,
    pub unrealized: f64,
    pub inventory: f64,
    /// Capital plus realized and unrealized P&L, net of fees
    pub equity: f64,
}

/// Accumulates fills, equity samples, and order-flow counters for one run.
pub struct MetricsAggregator {
    initial_capital: f64,
    tick_interval_ns: i64,
    equity: Vec<EquityPoint>,
    fills: Vec<Fill>,
    orders_submitted: u64,
    orders_cancelled: u64,
    orders_rejected: u64,
    last_mark: Option<f64>,
}

impl MetricsAggregator {
    pub fn new(initial_capital: f64, tick_interval_ns: i64) -> Self {
        Self {
            initial_capital,
            tick_interval_ns,
            equity: Vec::new(),
            fills: Vec::new(),
            orders_submitted: 0,
            orders_cancelled: 0,
            orders_rejected: 0,
            last_mark: None,
        }
    }

    /// Sample the equity curve. When the book is one-sided the previous
    /// mark carries over so unrealized P&L never jumps to zero spuriously.
    pub fn record_tick(&mut self, ts: Nanos, position: &Position, mid: Option<f64>) {
        if mid.is_some() {
            self.last_mark = mid;
        }
        let unrealized = self
            .last_mark
            .map(|mark| position.unrealized(mark))
            .unwrap_or(0.0);
        let equity =
            self.initial_capital + position.realized_pnl - position.fees_paid + unrealized;
        self.equity.push(EquityPoint {
            ts,
            realized: position.realized_pnl,
            unrealized,
            inventory: position.qty,
            equity,
        });
    }

    pub fn record_fill(&mut self, fill: &Fill) {
        self.fills.push(*fill);
    }

    pub fn note_submitted(&mut self) {
        self.orders_submitted += 1;
    }

    pub fn note_cancelled(&mut self) {
        self.orders_cancelled += 1;
    }

    pub fn note_rejected(&mut self) {
        self.orders_rejected += 1;
    }

    pub fn fills(&self) -> &[Fill] {
        &self.fills
    }

    /// Close the run and produce the report. `error` tags a run aborted
    /// mid-replay; the metrics collected up to that point are preserved.
    pub fn finalize(
        mut self,
        position: &Position,
        final_mark: Option<f64>,
        end_ts: Nanos,
        error: Option<String>,
    ) -> BacktestResult {
        // Final sample so the curve always reaches the end of the run
        self.record_tick(end_ts, position, final_mark);
        let summary = summarize(
            self.initial_capital,
            self.tick_interval_ns,
            &self.equity,
            &self.fills,
            self.orders_submitted,
            self.orders_cancelled,
            self.orders_rejected,
            position,
        );
        BacktestResult {
            run_id: Uuid::new_v4(),
            generated_at: Utc::now(),
            complete: error.is_none(),
            error,
            summary,
            equity: self.equity,
            fills: self.fills,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Side;

    fn filled_position() -> Position {
        let mut position = Position::default();
        position.apply_fill(Side::Buy, 100.0, 2.0, 0.0);
        position
    }

    #[test]
    fn test_record_tick_samples_equity() {
        let mut metrics = MetricsAggregator::new(1_000.0, 100);
        let position = filled_position();
        metrics.record_tick(0, &position, Some(101.0));

        assert_eq!(metrics.equity.len(), 1);
        let point = metrics.equity[0];
        assert_eq!(point.inventory, 2.0);
        assert!((point.unrealized - 2.0).abs() < 1e-12);
        assert!((point.equity - 1_002.0).abs() < 1e-12);
    }

    #[test]
    fn test_mark_carries_over_one_sided_book() {
        let mut metrics = MetricsAggregator::new(1_000.0, 100);
        let position = filled_position();
        metrics.record_tick(0, &position, Some(101.0));
        metrics.record_tick(100, &position, None);

        assert!((metrics.equity[1].unrealized - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_finalize_reports_complete_run() {
        let mut metrics = MetricsAggregator::new(1_000.0, 100);
        let position = Position::default();
        metrics.record_tick(0, &position, Some(100.0));
        let result = metrics.finalize(&position, Some(100.0), 200, None);

        assert!(result.complete);
        assert!(result.error.is_none());
        assert_eq!(result.equity.len(), 2);
        assert_eq!(result.summary.total_fills, 0);
    }

    #[test]
    fn test_finalize_tags_aborted_run() {
        let metrics = MetricsAggregator::new(1_000.0, 100);
        let position = Position::default();
        let result = metrics.finalize(&position, None, 0, Some("bad input".into()));

        assert!(!result.complete);
        assert_eq!(result.error.as_deref(), Some("bad input"));
    }
}
