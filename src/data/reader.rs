//! Streaming event reader
//!
//! Pulls records one at a time so an abort mid-replay still leaves the
//! metrics collected so far intact. Monotonicity of exchange timestamps is
//! enforced while reading; violations are fatal.

use super::{InputError, MarketEvent, RECORD_SIZE};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// Reads normalized event records from a file in stream order.
pub struct EventReader {
    inner: BufReader<File>,
    index: u64,
    last_exch_ts: Option<i64>,
    peeked: Option<MarketEvent>,
    done: bool,
}

impl EventReader {
    /// Open a record file for replay.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, InputError> {
        let file = File::open(path)?;
        Ok(Self {
            inner: BufReader::new(file),
            index: 0,
            last_exch_ts: None,
            peeked: None,
            done: false,
        })
    }

    /// Number of records consumed so far.
    pub fn records_read(&self) -> u64 {
        self.index
    }

    /// Look at the next event without consuming it.
    pub fn peek(&mut self) -> Result<Option<MarketEvent>, InputError> {
        if self.peeked.is_none() && !self.done {
            self.peeked = self.read_record()?;
        }
        Ok(self.peeked)
    }

    /// Consume and return the next event, `None` at end of stream.
    pub fn next_event(&mut self) -> Result<Option<MarketEvent>, InputError> {
        if let Some(event) = self.peeked.take() {
            return Ok(Some(event));
        }
        if self.done {
            return Ok(None);
        }
        self.read_record()
    }

    fn read_record(&mut self) -> Result<Option<MarketEvent>, InputError> {
        let offset = self.index * RECORD_SIZE as u64;
        let mut buf = [0u8; RECORD_SIZE];
        let mut filled = 0;
        while filled < RECORD_SIZE {
            let n = self.inner.read(&mut buf[filled..])?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        if filled == 0 {
            self.done = true;
            return Ok(None);
        }
        if filled < RECORD_SIZE {
            return Err(InputError::Malformed {
                offset,
                reason: format!("truncated record ({filled} of {RECORD_SIZE} bytes)"),
            });
        }

        let event = MarketEvent::decode(&buf, offset)?;
        if let Some(prev) = self.last_exch_ts {
            if event.exch_ts < prev {
                return Err(InputError::NonMonotonic {
                    index: self.index,
                    prev,
                    next: event.exch_ts,
                });
            }
        }
        self.last_exch_ts = Some(event.exch_ts);
        self.index += 1;
        Ok(Some(event))
    }
}

/// Load a whole record file into memory (used for initial book snapshots).
///
/// An empty file is an error: a snapshot or stream with no events cannot
/// seed a replay.
pub fn load_all(path: impl AsRef<Path>) -> Result<Vec<MarketEvent>, InputError> {
    let mut reader = EventReader::open(path)?;
    let mut events = Vec::new();
    while let Some(event) = reader.next_event()? {
        events.push(event);
    }
    if events.is_empty() {
        return Err(InputError::EmptyStream);
    }
    Ok(events)
}
