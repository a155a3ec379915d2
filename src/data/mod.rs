//! Market data input
//!
//! Normalized event records produced by the external recorder/merge step,
//! read back as a replayable stream.

mod format;
mod reader;

pub use format::{
    EventKind, MarketEvent, Nanos, Side, BUY_EVENT, DEPTH_EVENT, EXCH_EVENT, LOCAL_EVENT,
    RECORD_SIZE, SELL_EVENT, TRADE_EVENT,
};
pub use reader::{load_all, EventReader};

use thiserror::Error;

/// Fatal input-stream errors; the run aborts with partial metrics preserved.
#[derive(Debug, Error)]
pub enum InputError {
    /// Underlying file error
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    /// Record that cannot be decoded (bad flags, truncated file, local < exch)
    #[error("malformed record at offset {offset}: {reason}")]
    Malformed { offset: u64, reason: String },
    /// Exchange timestamps must be non-decreasing within one stream
    #[error("non-monotonic exchange timestamp at record {index}: {prev} -> {next}")]
    NonMonotonic { index: u64, prev: Nanos, next: Nanos },
    /// A stream with no events cannot be replayed
    #[error("event stream is empty")]
    EmptyStream,
}
