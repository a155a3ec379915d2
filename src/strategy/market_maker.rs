//! Reservation-price market-making strategy
//!
//! Avellaneda-Stoikov style quoting with an alpha overlay: the reservation
//! price shifts with a forecast blended from micro-price, book-imbalance,
//! and trade-flow signals, and with inventory risk. Quotes are post-only and
//! replaced only when the desired price moves past the re-quote threshold.

use super::{Strategy, TickCtx};
use crate::config::QuotingConfig;
use crate::data::Side;
use crate::sim::{OrderId, OrderRequest, TimeInForce};
use std::collections::VecDeque;

#[derive(Debug, Clone, Copy)]
struct LiveQuote {
    id: OrderId,
    price_tick: i64,
}

/// Two-sided quoting around an inventory- and alpha-adjusted reservation
/// price.
pub struct MarketMaker {
    cfg: QuotingConfig,
    tick_size: f64,
    mids: VecDeque<f64>,
    next_id: OrderId,
    live_bid: Option<LiveQuote>,
    live_ask: Option<LiveQuote>,
}

impl MarketMaker {
    pub fn new(cfg: QuotingConfig, tick_size: f64) -> Self {
        let vol_window = cfg.vol_window;
        Self {
            cfg,
            tick_size,
            mids: VecDeque::with_capacity(vol_window),
            next_id: 1,
            live_bid: None,
            live_ask: None,
        }
    }

    fn push_mid(&mut self, mid: f64) {
        if self.mids.len() == self.cfg.vol_window {
            self.mids.pop_front();
        }
        self.mids.push_back(mid);
    }

    /// Rolling standard deviation of mid prices. Until the window is warm a
    /// wide placeholder keeps the quoter cautious; afterwards the estimate
    /// is floored at one tick.
    fn volatility(&self) -> f64 {
        if self.mids.len() < self.cfg.vol_window {
            return self.tick_size * 10.0;
        }
        let n = self.mids.len() as f64;
        let mean = self.mids.iter().sum::<f64>() / n;
        let variance = self.mids.iter().map(|m| (m - mean).powi(2)).sum::<f64>() / n;
        variance.sqrt().max(self.tick_size)
    }

    fn tick_of(&self, price: f64) -> i64 {
        (price / self.tick_size).round() as i64
    }

    /// Reconcile one side's quote with its desired price. Keeps the live
    /// quote when it is within the re-quote threshold, cancel-replaces
    /// otherwise, and pulls the quote when the side is not allowed.
    fn sync_side(
        &mut self,
        ctx: &mut TickCtx<'_>,
        side: Side,
        desired_tick: i64,
        allowed: bool,
        live: Option<LiveQuote>,
    ) -> Option<LiveQuote> {
        let live = live.filter(|q| ctx.order(q.id).is_some_and(|o| o.status.is_live()));

        if !allowed {
            if let Some(quote) = live {
                if let Err(err) = ctx.cancel(quote.id) {
                    tracing::debug!(order_id = quote.id, %err, "pull failed");
                }
            }
            return None;
        }

        if let Some(quote) = live {
            if (quote.price_tick - desired_tick).abs() < self.cfg.requote_ticks {
                return Some(quote);
            }
            if let Err(err) = ctx.cancel(quote.id) {
                tracing::debug!(order_id = quote.id, %err, "stale quote already terminal");
            }
        }

        let id = self.next_id;
        self.next_id += 1;
        let req = OrderRequest {
            id,
            side,
            price: desired_tick as f64 * self.tick_size,
            qty: self.cfg.order_qty,
            tif: TimeInForce::Gtx,
        };
        match ctx.submit(req) {
            Ok(()) => Some(LiveQuote {
                id,
                price_tick: desired_tick,
            }),
            Err(err) => {
                tracing::warn!(order_id = id, %err, "quote submission failed");
                None
            }
        }
    }
}

impl Strategy for MarketMaker {
    fn on_tick(&mut self, ctx: &mut TickCtx<'_>) -> anyhow::Result<()> {
        let (Some(best_bid), Some(best_ask)) = (ctx.book.best_bid(), ctx.book.best_ask()) else {
            return Ok(());
        };

        let tick = self.tick_size;
        let mid = (best_bid + best_ask) / 2.0;
        self.push_mid(mid);
        let volatility = self.volatility();

        let micro_alpha = ctx
            .signals
            .micro_price
            .map(|micro| (micro - mid) / tick)
            .unwrap_or(0.0);
        let forecast = self.cfg.alpha_weight * micro_alpha
            + self.cfg.imbalance_weight * ctx.signals.imbalance
            + self.cfg.flow_weight * ctx.signals.trade_flow;

        let position = ctx.position.qty;
        let reservation =
            mid + forecast * tick - position * self.cfg.gamma * volatility * volatility;
        let half_spread = (1.0 + self.cfg.gamma / self.cfg.k).ln() / self.cfg.gamma;
        // Inventory skew: long inventory lowers the bid and the ask to lean
        // the book toward unwinding
        let skew = if self.cfg.max_position > 0.0 {
            0.2 * position / self.cfg.max_position
        } else {
            0.0
        };

        let mut bid_tick = self.tick_of(reservation - half_spread * (1.0 + skew));
        let mut ask_tick = self.tick_of(reservation + half_spread * (1.0 - skew));
        if bid_tick >= ask_tick {
            bid_tick = self.tick_of(mid) - 1;
            ask_tick = self.tick_of(mid) + 1;
        }
        // Stay passive: never quote through the touch
        bid_tick = bid_tick.min(self.tick_of(best_bid));
        ask_tick = ask_tick.max(self.tick_of(best_ask));

        let can_buy = position < self.cfg.max_position;
        let can_sell = position > -self.cfg.max_position;

        let live_bid = self.live_bid.take();
        self.live_bid = self.sync_side(ctx, Side::Buy, bid_tick, can_buy, live_bid);
        let live_ask = self.live_ask.take();
        self.live_ask = self.sync_side(ctx, Side::Sell, ask_tick, can_sell, live_ask);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::book::OrderBookState;
    use crate::data::{EventKind, MarketEvent};
    use crate::sim::{MatchingEngine, OrderStatus};
    use crate::signal::SignalEngine;

    fn quoting_config() -> QuotingConfig {
        QuotingConfig {
            gamma: 0.1,
            k: 1.5,
            alpha_weight: 0.3,
            imbalance_weight: 0.5,
            flow_weight: 0.2,
            vol_window: 1000,
            order_qty: 1.0,
            max_position: 10.0,
            requote_ticks: 1,
        }
    }

    fn seeded_book() -> OrderBookState {
        let mut book = OrderBookState::new(0.1);
        for (side, price, qty) in [
            (Side::Buy, 100.0, 5.0),
            (Side::Sell, 100.2, 5.0),
        ] {
            book.apply(&MarketEvent {
                kind: EventKind::Depth,
                side,
                exch_ts: 0,
                local_ts: 0,
                price,
                qty,
            })
            .unwrap();
        }
        book
    }

    fn run_tick(
        maker: &mut MarketMaker,
        book: &OrderBookState,
        engine: &mut MatchingEngine,
        now: i64,
    ) -> usize {
        let signals = SignalEngine::new(1, 10).snapshot(book);
        let mut ctx = TickCtx::new(now, book, &signals, engine);
        maker.on_tick(&mut ctx).unwrap();
        ctx.into_actions().len()
    }

    #[test]
    fn test_quotes_both_sides_flat() {
        let book = seeded_book();
        let mut engine = MatchingEngine::new(0.1, 0.0, 0.0);
        let mut maker = MarketMaker::new(quoting_config(), 0.1);

        let actions = run_tick(&mut maker, &book, &mut engine, 0);
        assert_eq!(actions, 2);

        let views = engine.order_views();
        assert_eq!(views.len(), 2);
        let bid = views.iter().find(|o| o.side == Side::Buy).unwrap();
        let ask = views.iter().find(|o| o.side == Side::Sell).unwrap();
        assert_eq!(bid.status, OrderStatus::Pending);
        assert!(bid.price < ask.price);
        // Passive on both sides of the touch
        assert!(bid.price <= 100.0);
        assert!(ask.price >= 100.2);
    }

    #[test]
    fn test_no_requote_when_book_unchanged() {
        let book = seeded_book();
        let mut engine = MatchingEngine::new(0.1, 0.0, 0.0);
        let mut maker = MarketMaker::new(quoting_config(), 0.1);

        assert_eq!(run_tick(&mut maker, &book, &mut engine, 0), 2);
        // Same book, same desired quotes: the threshold suppresses churn
        assert_eq!(run_tick(&mut maker, &book, &mut engine, 100), 0);
    }

    #[test]
    fn test_requotes_after_book_shift() {
        let mut book = seeded_book();
        let mut engine = MatchingEngine::new(0.1, 0.0, 0.0);
        let mut maker = MarketMaker::new(quoting_config(), 0.1);

        assert_eq!(run_tick(&mut maker, &book, &mut engine, 0), 2);

        // Shift the whole market up by 1.0
        for (side, price, qty) in [
            (Side::Buy, 100.0, 0.0),
            (Side::Buy, 101.0, 5.0),
            (Side::Sell, 100.2, 0.0),
            (Side::Sell, 101.2, 5.0),
        ] {
            book.apply(&MarketEvent {
                kind: EventKind::Depth,
                side,
                exch_ts: 0,
                local_ts: 0,
                price,
                qty,
            })
            .unwrap();
        }
        // Both quotes are stale: two cancels and two replacements
        assert_eq!(run_tick(&mut maker, &book, &mut engine, 100), 4);
    }

    #[test]
    fn test_long_inventory_stops_bidding() {
        let mut book = seeded_book();
        let mut engine = MatchingEngine::new(0.1, 0.0, 0.0);

        // Deepen the ask, then take it all to reach the position cap
        book.apply(&MarketEvent {
            kind: EventKind::Depth,
            side: Side::Sell,
            exch_ts: 0,
            local_ts: 0,
            price: 100.2,
            qty: 10.0,
        })
        .unwrap();
        engine
            .submit(
                &OrderRequest {
                    id: 99,
                    side: Side::Buy,
                    price: 100.2,
                    qty: 10.0,
                    tif: TimeInForce::Gtc,
                },
                0,
            )
            .unwrap();
        engine.activate(99, &mut book, 0);
        assert_eq!(engine.position().qty, 10.0);
        // Restore the displayed ask for quoting context
        book.apply(&MarketEvent {
            kind: EventKind::Depth,
            side: Side::Sell,
            exch_ts: 0,
            local_ts: 0,
            price: 100.2,
            qty: 5.0,
        })
        .unwrap();

        let mut maker = MarketMaker::new(quoting_config(), 0.1);
        run_tick(&mut maker, &book, &mut engine, 100);

        let quotes: Vec<_> = engine
            .order_views()
            .into_iter()
            .filter(|o| o.id != 99 && o.status.is_live())
            .collect();
        assert_eq!(quotes.len(), 1);
        assert_eq!(quotes[0].side, Side::Sell);
    }

    #[test]
    fn test_inventory_lowers_reservation() {
        let book = seeded_book();

        let mut flat_engine = MatchingEngine::new(0.1, 0.0, 0.0);
        let mut flat_maker = MarketMaker::new(quoting_config(), 0.1);
        run_tick(&mut flat_maker, &book, &mut flat_engine, 0);
        let flat_bid = flat_engine
            .order_views()
            .into_iter()
            .find(|o| o.side == Side::Buy)
            .unwrap()
            .price;

        // Same book, but carrying a long position
        let mut long_engine = MatchingEngine::new(0.1, 0.0, 0.0);
        let mut scratch_book = book.clone();
        long_engine
            .submit(
                &OrderRequest {
                    id: 99,
                    side: Side::Buy,
                    price: 100.2,
                    qty: 5.0,
                    tif: TimeInForce::Gtc,
                },
                0,
            )
            .unwrap();
        long_engine.activate(99, &mut scratch_book, 0);
        let mut long_maker = MarketMaker::new(quoting_config(), 0.1);
        run_tick(&mut long_maker, &book, &mut long_engine, 0);
        let long_bid = long_engine
            .order_views()
            .into_iter()
            .find(|o| o.side == Side::Buy && o.id != 99)
            .unwrap()
            .price;

        assert!(
            long_bid < flat_bid,
            "long inventory should lower the bid ({long_bid} vs {flat_bid})"
        );
    }

    #[test]
    fn test_empty_book_quotes_nothing() {
        let book = OrderBookState::new(0.1);
        let mut engine = MatchingEngine::new(0.1, 0.0, 0.0);
        let mut maker = MarketMaker::new(quoting_config(), 0.1);
        assert_eq!(run_tick(&mut maker, &book, &mut engine, 0), 0);
    }
}
