//! Alpha signal layer
//!
//! Short-horizon predictive features recomputed from book and trade state
//! each tick.

mod alpha;

pub use alpha::{SignalEngine, SignalSnapshot};
