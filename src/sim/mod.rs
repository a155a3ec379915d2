//! Discrete-event exchange simulation
//!
//! Latency-delayed matching against the replayed book, with queue-position
//! tracking for the strategy's resting orders. Single-threaded and
//! deterministic: identical stream, configuration, and seed always produce
//! the identical fill sequence.

mod backtester;
mod clock;
mod latency;
mod matching;
mod order;
mod position;

pub use backtester::Backtester;
pub use clock::{EventQueue, SimEvent};
pub use latency::{latency_from_config, ConstantLatency, JitterLatency, LatencyModel};
pub use matching::MatchingEngine;
pub use order::{
    Fill, MatchError, OrderId, OrderRequest, OrderStatus, OrderView, StrategyOrder, TimeInForce,
};
pub use position::Position;
