//! Order book state
//!
//! Reconstructs best-bid/best-ask and full depth from the incremental
//! update stream.

mod book;

pub use book::OrderBookState;

use crate::data::Side;
use serde::Serialize;
use thiserror::Error;

/// One aggregated price level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PriceLevel {
    pub price: f64,
    pub qty: f64,
}

/// Recoverable book inconsistencies; tolerated and logged, never fatal.
#[derive(Debug, Error)]
pub enum BookError {
    /// A trade referenced a price level already removed by a depth update
    #[error("trade at {price} references a vanished {side:?} level")]
    VanishedLevel { side: Side, price: f64 },
}
