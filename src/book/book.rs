//! L2 order book reconstruction

use super::{BookError, PriceLevel};
use crate::data::{EventKind, MarketEvent, Side};
use std::collections::BTreeMap;

/// Smallest resting quantity kept at a level; below this the level is
/// removed to absorb floating-point dust from repeated decrements.
const QTY_EPS: f64 = 1e-9;

/// Aggregated L2 order book keyed by integer price ticks.
///
/// Depth updates carry absolute semantics: the quantity at the price is
/// replaced, and a quantity of zero removes the level. Trades decrement the
/// referenced level, clamped at zero.
#[derive(Debug, Clone)]
pub struct OrderBookState {
    tick_size: f64,
    bids: BTreeMap<i64, f64>,
    asks: BTreeMap<i64, f64>,
}

impl OrderBookState {
    /// Create an empty book for an instrument with the given tick size.
    pub fn new(tick_size: f64) -> Self {
        Self {
            tick_size,
            bids: BTreeMap::new(),
            asks: BTreeMap::new(),
        }
    }

    /// Tick size the book quantizes prices to.
    pub fn tick_size(&self) -> f64 {
        self.tick_size
    }

    /// Quantize a price to its tick index.
    pub fn tick_of(&self, price: f64) -> i64 {
        (price / self.tick_size).round() as i64
    }

    /// Price of a tick index.
    pub fn price_of(&self, tick: i64) -> f64 {
        tick as f64 * self.tick_size
    }

    /// Apply one market event to the book.
    pub fn apply(&mut self, event: &MarketEvent) -> Result<(), BookError> {
        let tick = self.tick_of(event.price);
        match event.kind {
            EventKind::Depth => {
                let levels = self.side_mut(event.side);
                if event.qty <= QTY_EPS {
                    levels.remove(&tick);
                } else {
                    levels.insert(tick, event.qty);
                }
                Ok(())
            }
            EventKind::Trade => {
                // A sell-initiated trade consumes bid liquidity and vice
                // versa. Clamp at zero: the referenced level may already be
                // gone after an out-of-order update.
                let levels = self.side_mut(event.side.opposite());
                match levels.get_mut(&tick) {
                    Some(qty) => {
                        *qty -= event.qty;
                        if *qty <= QTY_EPS {
                            levels.remove(&tick);
                        }
                        Ok(())
                    }
                    None => Err(BookError::VanishedLevel {
                        side: event.side.opposite(),
                        price: event.price,
                    }),
                }
            }
        }
    }

    /// Best bid price.
    pub fn best_bid(&self) -> Option<f64> {
        self.bids.keys().next_back().map(|&t| self.price_of(t))
    }

    /// Best ask price.
    pub fn best_ask(&self) -> Option<f64> {
        self.asks.keys().next().map(|&t| self.price_of(t))
    }

    /// Quantity at the best bid.
    pub fn best_bid_qty(&self) -> Option<f64> {
        self.bids.values().next_back().copied()
    }

    /// Quantity at the best ask.
    pub fn best_ask_qty(&self) -> Option<f64> {
        self.asks.values().next().copied()
    }

    /// Mid price, when both sides are present.
    pub fn mid_price(&self) -> Option<f64> {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => Some((bid + ask) / 2.0),
            _ => None,
        }
    }

    /// Bid/ask spread, when both sides are present.
    pub fn spread(&self) -> Option<f64> {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => Some(ask - bid),
            _ => None,
        }
    }

    /// Resting quantity at an exact tick, zero if the level is absent.
    pub fn qty_at(&self, side: Side, tick: i64) -> f64 {
        self.side_ref(side).get(&tick).copied().unwrap_or(0.0)
    }

    /// Whether a level exists at the tick.
    pub fn has_level(&self, side: Side, tick: i64) -> bool {
        self.side_ref(side).contains_key(&tick)
    }

    /// Best-first depth, up to `levels` entries.
    pub fn depth(&self, side: Side, levels: usize) -> Vec<PriceLevel> {
        let iter: Box<dyn Iterator<Item = (&i64, &f64)> + '_> = match side {
            Side::Buy => Box::new(self.bids.iter().rev()),
            Side::Sell => Box::new(self.asks.iter()),
        };
        iter.take(levels)
            .map(|(&t, &qty)| PriceLevel {
                price: self.price_of(t),
                qty,
            })
            .collect()
    }

    /// Aggregate quantity over the best `levels` levels of one side.
    pub fn top_qty(&self, side: Side, levels: usize) -> f64 {
        self.depth(side, levels).iter().map(|l| l.qty).sum()
    }

    /// Remove up to `qty` from a level, returning the amount actually
    /// removed. Used when a marketable order takes displayed liquidity.
    pub fn consume(&mut self, side: Side, tick: i64, qty: f64) -> f64 {
        let levels = self.side_mut(side);
        match levels.get_mut(&tick) {
            Some(resting) => {
                let taken = qty.min(*resting);
                *resting -= taken;
                if *resting <= QTY_EPS {
                    levels.remove(&tick);
                }
                taken
            }
            None => 0.0,
        }
    }

    /// True when neither side has any levels.
    pub fn is_empty(&self) -> bool {
        self.bids.is_empty() && self.asks.is_empty()
    }

    fn side_ref(&self, side: Side) -> &BTreeMap<i64, f64> {
        match side {
            Side::Buy => &self.bids,
            Side::Sell => &self.asks,
        }
    }

    fn side_mut(&mut self, side: Side) -> &mut BTreeMap<i64, f64> {
        match side {
            Side::Buy => &mut self.bids,
            Side::Sell => &mut self.asks,
        }
    }
}
