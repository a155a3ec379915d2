//! Fixed-width event record format
//!
//! Each record is 64 bytes, little-endian: a `u64` flag word, exchange and
//! local timestamps in nanoseconds, price and quantity as `f64`, an order id
//! used only by order-level feeds, and two reserved fields. Files from
//! separate recording sessions may be concatenated in timestamp order.

use super::InputError;
use serde::{Deserialize, Serialize};

/// Simulation/wire timestamp in nanoseconds.
pub type Nanos = i64;

/// Event originated at the exchange.
pub const EXCH_EVENT: u64 = 1;
/// Event originated locally (order-level feeds only; unused by L2 replay).
pub const LOCAL_EVENT: u64 = 1 << 1;
/// Depth (order book) update.
pub const DEPTH_EVENT: u64 = 1 << 2;
/// Executed trade.
pub const TRADE_EVENT: u64 = 1 << 3;
/// Bid side for depth updates; buy-initiated for trades.
pub const BUY_EVENT: u64 = 1 << 4;
/// Ask side for depth updates; sell-initiated for trades.
pub const SELL_EVENT: u64 = 1 << 5;

/// Size of one record on the wire.
pub const RECORD_SIZE: usize = 64;

/// Book side, or trade initiator side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// Bid side; for trades, the buyer was the aggressor
    Buy,
    /// Ask side; for trades, the seller was the aggressor
    Sell,
}

impl Side {
    /// +1 for buys, -1 for sells
    pub fn sign(self) -> f64 {
        match self {
            Side::Buy => 1.0,
            Side::Sell => -1.0,
        }
    }

    /// The opposite side
    pub fn opposite(self) -> Side {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

/// Event class carried by a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// Absolute depth update: replaces the quantity at the price
    Depth,
    /// Executed trade
    Trade,
}

/// A decoded market event.
///
/// `local_ts` is when the recorder observed the event and is always
/// `>= exch_ts`; the gap is the recorded feed latency.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarketEvent {
    pub kind: EventKind,
    pub side: Side,
    pub exch_ts: Nanos,
    pub local_ts: Nanos,
    pub price: f64,
    pub qty: f64,
}

impl MarketEvent {
    /// Decode one wire record. `offset` is only used for diagnostics.
    pub fn decode(buf: &[u8; RECORD_SIZE], offset: u64) -> Result<Self, InputError> {
        let ev = u64::from_le_bytes(buf[0..8].try_into().unwrap());
        let exch_ts = i64::from_le_bytes(buf[8..16].try_into().unwrap());
        let local_ts = i64::from_le_bytes(buf[16..24].try_into().unwrap());
        let price = f64::from_le_bytes(buf[24..32].try_into().unwrap());
        let qty = f64::from_le_bytes(buf[32..40].try_into().unwrap());
        // bytes 40..64: order_id + reserved fields, unused by L2 replay

        let kind = match (ev & DEPTH_EVENT != 0, ev & TRADE_EVENT != 0) {
            (true, false) => EventKind::Depth,
            (false, true) => EventKind::Trade,
            _ => {
                return Err(InputError::Malformed {
                    offset,
                    reason: format!("flag word {ev:#x} is neither depth nor trade"),
                })
            }
        };
        let side = match (ev & BUY_EVENT != 0, ev & SELL_EVENT != 0) {
            (true, false) => Side::Buy,
            (false, true) => Side::Sell,
            _ => {
                return Err(InputError::Malformed {
                    offset,
                    reason: format!("flag word {ev:#x} has no unambiguous side"),
                })
            }
        };
        if local_ts < exch_ts {
            return Err(InputError::Malformed {
                offset,
                reason: format!("local timestamp {local_ts} precedes exchange timestamp {exch_ts}"),
            });
        }
        if !price.is_finite() || !qty.is_finite() || qty < 0.0 {
            return Err(InputError::Malformed {
                offset,
                reason: format!("non-finite or negative price/quantity ({price}, {qty})"),
            });
        }

        Ok(Self {
            kind,
            side,
            exch_ts,
            local_ts,
            price,
            qty,
        })
    }

    /// Encode to the wire layout. Used for fixtures and the dummy-data tool.
    pub fn encode(&self) -> [u8; RECORD_SIZE] {
        let mut buf = [0u8; RECORD_SIZE];
        let kind_flag = match self.kind {
            EventKind::Depth => DEPTH_EVENT,
            EventKind::Trade => TRADE_EVENT,
        };
        let side_flag = match self.side {
            Side::Buy => BUY_EVENT,
            Side::Sell => SELL_EVENT,
        };
        let ev = EXCH_EVENT | kind_flag | side_flag;
        buf[0..8].copy_from_slice(&ev.to_le_bytes());
        buf[8..16].copy_from_slice(&self.exch_ts.to_le_bytes());
        buf[16..24].copy_from_slice(&self.local_ts.to_le_bytes());
        buf[24..32].copy_from_slice(&self.price.to_le_bytes());
        buf[32..40].copy_from_slice(&self.qty.to_le_bytes());
        buf
    }
}
