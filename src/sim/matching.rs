//! Matching and queue-position engine
//!
//! Tracks the strategy's orders against the replayed book under price-time
//! priority. An order acks into the queue behind all resting interest at its
//! price: the public book quantity (or a configurable synthetic estimate
//! when the level is not displayed) plus the strategy's own earlier orders.
//! Incoming trades and depth reductions at the price consume the ahead
//! quantity first; only the overflow fills the order. The strategy's fills
//! never mutate the public book: its volume is treated as additional to the
//! recorded liquidity, since the public queue composition is unobservable
//! from an L2 feed.

use super::order::{Fill, MatchError, OrderId, OrderRequest, OrderStatus, StrategyOrder};
use super::position::Position;
use super::TimeInForce;
use crate::book::OrderBookState;
use crate::data::{EventKind, MarketEvent, Nanos, Side};
use std::collections::BTreeMap;

const QTY_EPS: f64 = 1e-9;

/// Simulated exchange for the strategy's own orders.
pub struct MatchingEngine {
    tick_size: f64,
    fee_rate: f64,
    assumed_queue_depth: f64,
    orders: BTreeMap<OrderId, StrategyOrder>,
    position: Position,
    next_seq: u64,
}

impl MatchingEngine {
    pub fn new(tick_size: f64, fee_rate: f64, assumed_queue_depth: f64) -> Self {
        Self {
            tick_size,
            fee_rate,
            assumed_queue_depth,
            orders: BTreeMap::new(),
            position: Position::default(),
            next_seq: 0,
        }
    }

    /// Register a new order as in flight.
    ///
    /// Validation is synchronous; the order only reaches the exchange when
    /// [`MatchingEngine::activate`] runs after the ack delay.
    pub fn submit(&mut self, req: &OrderRequest, now: Nanos) -> Result<(), MatchError> {
        if !req.qty.is_finite() || req.qty <= 0.0 {
            return Err(MatchError::InvalidRequest(format!(
                "quantity {} must be positive",
                req.qty
            )));
        }
        if !req.price.is_finite() || req.price <= 0.0 {
            return Err(MatchError::InvalidRequest(format!(
                "price {} must be positive",
                req.price
            )));
        }
        if self.orders.get(&req.id).is_some_and(|o| o.status.is_live()) {
            return Err(MatchError::DuplicateId(req.id));
        }

        let price_tick = (req.price / self.tick_size).round() as i64;
        let seq = self.next_seq;
        self.next_seq += 1;
        self.orders.insert(
            req.id,
            StrategyOrder {
                id: req.id,
                side: req.side,
                price: price_tick as f64 * self.tick_size,
                price_tick,
                qty: req.qty,
                remaining: req.qty,
                status: OrderStatus::Pending,
                tif: req.tif,
                submitted_at: now,
                seq,
                ahead: 0.0,
            },
        );
        Ok(())
    }

    /// The order reaches the exchange after its ack delay.
    ///
    /// A post-only order that would cross is rejected. A marketable `Gtc`
    /// order takes displayed liquidity level-by-level up to its limit price;
    /// any remainder rests. Non-crossing orders rest behind the queue ahead
    /// at their price.
    pub fn activate(&mut self, id: OrderId, book: &mut OrderBookState, now: Nanos) -> Vec<Fill> {
        let Some(order) = self.orders.get(&id) else {
            return Vec::new();
        };
        if order.status != OrderStatus::Pending {
            // Cancelled while in flight
            return Vec::new();
        }
        let (side, price_tick, tif, seq) = (order.side, order.price_tick, order.tif, order.seq);

        let crossing = match side {
            Side::Buy => book
                .best_ask()
                .is_some_and(|ask| price_tick >= book.tick_of(ask)),
            Side::Sell => book
                .best_bid()
                .is_some_and(|bid| price_tick <= book.tick_of(bid)),
        };

        if crossing && tif == TimeInForce::Gtx {
            let order = self.orders.get_mut(&id).expect("checked above");
            order.status = OrderStatus::Rejected;
            tracing::debug!(order_id = id, price = order.price, "post-only order rejected");
            return Vec::new();
        }

        let mut fills = Vec::new();
        if crossing {
            fills = self.take_liquidity(id, book, now);
        }

        let ahead = self.queued_ahead(side, price_tick, seq, book);
        let order = self.orders.get_mut(&id).expect("checked above");
        if order.remaining > QTY_EPS {
            order.ahead = ahead;
            order.status = if order.remaining < order.qty {
                OrderStatus::PartiallyFilled
            } else {
                OrderStatus::Resting
            };
        }
        fills
    }

    /// Synchronous cancel validation; the effect is applied after the ack
    /// delay via [`MatchingEngine::apply_cancel`].
    pub fn request_cancel(&self, id: OrderId) -> Result<(), MatchError> {
        match self.orders.get(&id) {
            Some(order) if order.status.is_live() => Ok(()),
            _ => Err(MatchError::NotFound(id)),
        }
    }

    /// The cancel reaches the exchange. Returns false when it lost the race
    /// to a fill. Later own orders at the price shift forward by the
    /// cancelled remainder.
    pub fn apply_cancel(&mut self, id: OrderId, _now: Nanos) -> bool {
        let Some(order) = self.orders.get(&id) else {
            return false;
        };
        if !order.status.is_live() {
            return false;
        }
        let (side, price_tick, seq, remaining, was_pending) = (
            order.side,
            order.price_tick,
            order.seq,
            order.remaining,
            order.status == OrderStatus::Pending,
        );

        let order = self.orders.get_mut(&id).expect("checked above");
        order.status = OrderStatus::Cancelled;

        if !was_pending {
            for other in self.orders.values_mut() {
                if other.side == side
                    && other.price_tick == price_tick
                    && other.seq > seq
                    && matches!(
                        other.status,
                        OrderStatus::Resting | OrderStatus::PartiallyFilled
                    )
                {
                    other.ahead = (other.ahead - remaining).max(0.0);
                }
            }
        }
        true
    }

    /// Observe one market event before it is applied to the exchange book,
    /// producing any fills of the strategy's resting orders.
    pub fn on_event(
        &mut self,
        event: &MarketEvent,
        book: &OrderBookState,
        now: Nanos,
    ) -> Vec<Fill> {
        let event_tick = book.tick_of(event.price);
        // Which of our orders can this event execute, and how much volume
        // does it consume at the level?
        let (affected_side, consumed, is_trade) = match event.kind {
            // A sell-initiated trade consumes bids (our buys), and vice versa
            EventKind::Trade => (event.side.opposite(), event.qty, true),
            EventKind::Depth => {
                let old = book.qty_at(event.side, event_tick);
                let new = event.qty.max(0.0);
                if new >= old {
                    // Added liquidity queues behind existing interest
                    return Vec::new();
                }
                (event.side, old - new, false)
            }
        };
        if consumed <= QTY_EPS {
            return Vec::new();
        }

        let mut queue: Vec<(u64, OrderId)> = self
            .orders
            .values()
            .filter(|o| {
                o.side == affected_side
                    && matches!(
                        o.status,
                        OrderStatus::Resting | OrderStatus::PartiallyFilled
                    )
            })
            .map(|o| (o.seq, o.id))
            .collect();
        queue.sort_unstable();

        let mut fills = Vec::new();
        for (_, id) in queue {
            let order = self.orders.get_mut(&id).expect("id collected above");
            let traded_through = is_trade
                && match affected_side {
                    Side::Buy => event_tick < order.price_tick,
                    Side::Sell => event_tick > order.price_tick,
                };

            let fill_qty = if traded_through {
                // The market traded past the level; everything queued there
                // is gone, including us
                order.ahead = 0.0;
                order.remaining
            } else if order.price_tick == event_tick {
                let ahead = order.ahead;
                order.ahead = (ahead - consumed).max(0.0);
                (consumed - ahead).clamp(0.0, order.remaining)
            } else {
                0.0
            };

            if fill_qty <= QTY_EPS {
                continue;
            }
            let fill = self.execute(id, fill_qty, now, true);
            fills.push(fill);
        }
        fills
    }

    /// Current position (engine-owned; callers get a copy).
    pub fn position(&self) -> Position {
        self.position
    }

    /// Order state by id.
    pub fn order(&self, id: OrderId) -> Option<&StrategyOrder> {
        self.orders.get(&id)
    }

    /// All tracked orders in arrival order, as read-only views.
    pub fn order_views(&self) -> Vec<super::OrderView> {
        let mut orders: Vec<&StrategyOrder> = self.orders.values().collect();
        orders.sort_by_key(|o| o.seq);
        orders.iter().map(|o| super::OrderView::from(*o)).collect()
    }

    /// Drop terminal orders from the table, returning them for archival.
    pub fn clear_inactive(&mut self) -> Vec<StrategyOrder> {
        let mut removed = Vec::new();
        self.orders.retain(|_, order| {
            if order.status.is_terminal() {
                removed.push(order.clone());
                false
            } else {
                true
            }
        });
        removed.sort_by_key(|o| o.seq);
        removed
    }

    fn queued_ahead(&self, side: Side, price_tick: i64, seq: u64, book: &OrderBookState) -> f64 {
        let public = if book.has_level(side, price_tick) {
            book.qty_at(side, price_tick)
        } else {
            self.assumed_queue_depth
        };
        let own: f64 = self
            .orders
            .values()
            .filter(|o| {
                o.side == side
                    && o.price_tick == price_tick
                    && o.seq < seq
                    && matches!(
                        o.status,
                        OrderStatus::Resting | OrderStatus::PartiallyFilled
                    )
            })
            .map(|o| o.remaining)
            .sum();
        public + own
    }

    fn take_liquidity(&mut self, id: OrderId, book: &mut OrderBookState, now: Nanos) -> Vec<Fill> {
        let order = self.orders.get(&id).expect("caller holds id");
        let (side, limit_tick) = (order.side, order.price_tick);
        let opposite = side.opposite();
        let mut remaining = order.remaining;
        let mut fills = Vec::new();

        while remaining > QTY_EPS {
            let best = match opposite {
                Side::Buy => book.best_bid(),
                Side::Sell => book.best_ask(),
            };
            let Some(best_price) = best else { break };
            let best_tick = book.tick_of(best_price);
            let crosses = match side {
                Side::Buy => best_tick <= limit_tick,
                Side::Sell => best_tick >= limit_tick,
            };
            if !crosses {
                break;
            }
            let taken = book.consume(opposite, best_tick, remaining);
            if taken <= QTY_EPS {
                break;
            }
            remaining -= taken;
            let order = self.orders.get_mut(&id).expect("caller holds id");
            order.remaining = remaining;
            // Price improvement: the fill happens at the displayed level
            let fill_price = best_tick as f64 * self.tick_size;
            let fee = fill_price * taken * self.fee_rate;
            order.status = if remaining <= QTY_EPS {
                OrderStatus::Filled
            } else {
                OrderStatus::PartiallyFilled
            };
            self.position.apply_fill(side, fill_price, taken, fee);
            fills.push(Fill {
                order_id: id,
                side,
                price: fill_price,
                qty: taken,
                ts: now,
                fee,
                maker: false,
            });
        }
        fills
    }

    fn execute(&mut self, id: OrderId, qty: f64, now: Nanos, maker: bool) -> Fill {
        let order = self.orders.get_mut(&id).expect("caller holds id");
        order.remaining = (order.remaining - qty).max(0.0);
        order.status = if order.remaining <= QTY_EPS {
            order.remaining = 0.0;
            OrderStatus::Filled
        } else {
            OrderStatus::PartiallyFilled
        };
        let (side, price) = (order.side, order.price);
        let fee = price * qty * self.fee_rate;
        self.position.apply_fill(side, price, qty, fee);
        Fill {
            order_id: id,
            side,
            price,
            qty,
            ts: now,
            fee,
            maker,
        }
    }
}
