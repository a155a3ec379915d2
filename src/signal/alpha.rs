//! Imbalance, micro-price, and trade-flow signals

use crate::book::OrderBookState;
use crate::data::Side;
use std::collections::VecDeque;

/// Point-in-time signal values, recomputed each tick and discarded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignalSnapshot {
    /// Top-of-book (or top-K) quantity imbalance in [-1, 1]; 0 when the
    /// book is empty
    pub imbalance: f64,
    /// Quantity-weighted fair price; `None` when either side is empty
    pub micro_price: Option<f64>,
    /// Signed volume imbalance over the trailing trade window in [-1, 1];
    /// 0 when the window is empty
    pub trade_flow: f64,
}

/// Computes signal snapshots from the current book and a bounded trailing
/// trade window.
#[derive(Debug)]
pub struct SignalEngine {
    depth_levels: usize,
    window: usize,
    trades: VecDeque<(Side, f64)>,
}

impl SignalEngine {
    /// `depth_levels` is the K used for book imbalance aggregation;
    /// `window` bounds the trailing trade count.
    pub fn new(depth_levels: usize, window: usize) -> Self {
        Self {
            depth_levels,
            window,
            trades: VecDeque::with_capacity(window),
        }
    }

    /// Record an observed trade. The side is the initiator side resolved at
    /// ingestion; it is never re-derived here.
    pub fn record_trade(&mut self, side: Side, qty: f64) {
        if self.trades.len() == self.window {
            self.trades.pop_front();
        }
        self.trades.push_back((side, qty));
    }

    /// Compute a fresh snapshot from the strategy-visible book.
    pub fn snapshot(&self, book: &OrderBookState) -> SignalSnapshot {
        SignalSnapshot {
            imbalance: self.imbalance(book),
            micro_price: Self::micro_price(book),
            trade_flow: self.trade_flow(),
        }
    }

    fn imbalance(&self, book: &OrderBookState) -> f64 {
        let bid_qty = book.top_qty(Side::Buy, self.depth_levels);
        let ask_qty = book.top_qty(Side::Sell, self.depth_levels);
        let total = bid_qty + ask_qty;
        if total <= 0.0 {
            return 0.0;
        }
        (bid_qty - ask_qty) / total
    }

    fn micro_price(book: &OrderBookState) -> Option<f64> {
        let bid = book.best_bid()?;
        let ask = book.best_ask()?;
        let bid_qty = book.best_bid_qty()?;
        let ask_qty = book.best_ask_qty()?;
        let total = bid_qty + ask_qty;
        if total <= 0.0 {
            return None;
        }
        Some((bid * ask_qty + ask * bid_qty) / total)
    }

    fn trade_flow(&self) -> f64 {
        let mut buy_vol = 0.0;
        let mut sell_vol = 0.0;
        for &(side, qty) in &self.trades {
            match side {
                Side::Buy => buy_vol += qty,
                Side::Sell => sell_vol += qty,
            }
        }
        let total = buy_vol + sell_vol;
        if total <= 0.0 {
            return 0.0;
        }
        (buy_vol - sell_vol) / total
    }
}
