//! Strategy runtime
//!
//! A pluggable decision function invoked once per scheduled tick. The
//! scheduler hands it a [`TickCtx`] with the strategy-visible book, its
//! position, the signal snapshot, and its live orders; submit/cancel calls
//! validate synchronously and take effect after the exchange ack delay.

mod market_maker;

pub use market_maker::MarketMaker;

use crate::book::OrderBookState;
use crate::data::Nanos;
use crate::sim::{MatchError, MatchingEngine, OrderId, OrderRequest, OrderView, Position};
use crate::signal::SignalSnapshot;

/// Actions queued during one tick, realized by the scheduler as
/// latency-delayed events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickAction {
    Submit(OrderId),
    Cancel(OrderId),
}

/// Per-tick view of the simulation handed to the strategy.
pub struct TickCtx<'a> {
    /// Current simulation time
    pub now: Nanos,
    /// Strategy-visible book (market events delayed by observation latency)
    pub book: &'a OrderBookState,
    /// Signals recomputed for this tick
    pub signals: &'a SignalSnapshot,
    /// Copy of the current position
    pub position: Position,
    /// The strategy's tracked orders, in arrival order
    pub orders: Vec<OrderView>,
    engine: &'a mut MatchingEngine,
    actions: Vec<TickAction>,
}

impl<'a> TickCtx<'a> {
    pub(crate) fn new(
        now: Nanos,
        book: &'a OrderBookState,
        signals: &'a SignalSnapshot,
        engine: &'a mut MatchingEngine,
    ) -> Self {
        let position = engine.position();
        let orders = engine.order_views();
        Self {
            now,
            book,
            signals,
            position,
            orders,
            engine,
            actions: Vec::new(),
        }
    }

    /// Submit an order. Validation errors are returned immediately; an
    /// accepted order reaches the exchange after the ack delay.
    pub fn submit(&mut self, req: OrderRequest) -> Result<(), MatchError> {
        self.engine.submit(&req, self.now)?;
        self.actions.push(TickAction::Submit(req.id));
        Ok(())
    }

    /// Request a cancel. Unknown or terminal ids fail immediately; an
    /// accepted cancel reaches the exchange after the ack delay.
    pub fn cancel(&mut self, id: OrderId) -> Result<(), MatchError> {
        self.engine.request_cancel(id)?;
        self.actions.push(TickAction::Cancel(id));
        Ok(())
    }

    /// Look up one of the strategy's orders by id.
    pub fn order(&self, id: OrderId) -> Option<&OrderView> {
        self.orders.iter().find(|o| o.id == id)
    }

    pub(crate) fn into_actions(self) -> Vec<TickAction> {
        self.actions
    }
}

/// A trading strategy driven by the scheduler.
///
/// Implementations keep their scratch state in `self` and must return at
/// every tick boundary; all waiting happens in the scheduler.
pub trait Strategy {
    /// Invoked once per scheduled tick.
    fn on_tick(&mut self, ctx: &mut TickCtx<'_>) -> anyhow::Result<()>;
}
