//! Strategy order types

use crate::data::{Nanos, Side};
use serde::Serialize;
use thiserror::Error;

/// Strategy-chosen order identifier; unique among live orders.
pub type OrderId = u64;

/// Time-in-force for limit orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TimeInForce {
    /// Good till cancelled; takes displayed liquidity when marketable
    Gtc,
    /// Post-only; rejected at the exchange if it would cross
    Gtx,
}

/// Lifecycle of a strategy order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum OrderStatus {
    /// In flight to the exchange, not yet acknowledged
    Pending,
    /// Acknowledged and queued at its price level
    Resting,
    /// Resting with some quantity already executed
    PartiallyFilled,
    /// Fully executed
    Filled,
    /// Cancelled before completion
    Cancelled,
    /// Refused by the exchange (post-only order that would cross)
    Rejected,
}

impl OrderStatus {
    /// Terminal states are never revisited.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            OrderStatus::Filled | OrderStatus::Cancelled | OrderStatus::Rejected
        )
    }

    /// Live states may still fill or be cancelled.
    pub fn is_live(self) -> bool {
        !self.is_terminal()
    }
}

/// A submit request from the strategy.
#[derive(Debug, Clone, Copy)]
pub struct OrderRequest {
    pub id: OrderId,
    pub side: Side,
    pub price: f64,
    pub qty: f64,
    pub tif: TimeInForce,
}

/// An order as tracked by the matching engine.
///
/// Owned by the engine; the strategy sees [`OrderView`] copies and refers to
/// orders by id only.
#[derive(Debug, Clone)]
pub struct StrategyOrder {
    pub id: OrderId,
    pub side: Side,
    pub price: f64,
    pub price_tick: i64,
    pub qty: f64,
    pub remaining: f64,
    pub status: OrderStatus,
    pub tif: TimeInForce,
    pub submitted_at: Nanos,
    /// Arrival sequence; later orders queue behind earlier ones
    pub seq: u64,
    /// Quantity still queued ahead at this price (set at ack)
    pub ahead: f64,
}

/// Read-only order state handed to the strategy each tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrderView {
    pub id: OrderId,
    pub side: Side,
    pub price: f64,
    pub qty: f64,
    pub remaining: f64,
    pub status: OrderStatus,
}

impl From<&StrategyOrder> for OrderView {
    fn from(order: &StrategyOrder) -> Self {
        Self {
            id: order.id,
            side: order.side,
            price: order.price,
            qty: order.qty,
            remaining: order.remaining,
            status: order.status,
        }
    }
}

/// An execution against one of the strategy's orders.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Fill {
    pub order_id: OrderId,
    pub side: Side,
    pub price: f64,
    pub qty: f64,
    pub ts: Nanos,
    pub fee: f64,
    /// False when the order took displayed liquidity at ack
    pub maker: bool,
}

impl Fill {
    /// Gross traded notional.
    pub fn notional(&self) -> f64 {
        self.price * self.qty
    }
}

/// Recoverable order-action failures, reported to the strategy and never
/// fatal to the run.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MatchError {
    /// Cancel referenced an unknown or already-terminal order id
    #[error("order {0} not found or terminal")]
    NotFound(OrderId),
    /// Submit reused an id that is still live
    #[error("order id {0} already live")]
    DuplicateId(OrderId),
    /// Submit carried a non-positive or non-finite quantity or price
    #[error("invalid order request: {0}")]
    InvalidRequest(String),
}
