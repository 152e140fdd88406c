//! Half-open range cursors for chunked queries.

use crate::error::{ProtocolError, ProtocolResult};
use serde::{Deserialize, Serialize};

/// A half-open offset range `[start, end)` with `end > start`.
///
/// Cursors only move forward: [`RangeCursor::advance`] shifts the
/// window by its own width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RangeCursor {
    start: u64,
    end: u64,
}

impl RangeCursor {
    /// Creates a cursor, rejecting empty or inverted ranges.
    pub fn new(start: u64, end: u64) -> ProtocolResult<Self> {
        if end <= start {
            return Err(ProtocolError::InvalidRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// The first chunk of a walk: `[offset, offset + chunk_size)`.
    pub fn first(offset: u64, chunk_size: u64) -> ProtocolResult<Self> {
        let end = offset
            .checked_add(chunk_size)
            .ok_or(ProtocolError::RangeOverflow {
                start: offset,
                end: u64::MAX,
            })?;
        Self::new(offset, end)
    }

    /// Start offset (inclusive).
    pub fn start(&self) -> u64 {
        self.start
    }

    /// End offset (exclusive).
    pub fn end(&self) -> u64 {
        self.end
    }

    /// Width of the range.
    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    /// Always false; a cursor is never empty.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Returns true if `offset` falls inside the range.
    pub fn contains(&self, offset: u64) -> bool {
        (self.start..self.end).contains(&offset)
    }

    /// The next chunk of the same width.
    pub fn advance(&self) -> ProtocolResult<Self> {
        let overflow = ProtocolError::RangeOverflow {
            start: self.start,
            end: self.end,
        };
        let end = self.end.checked_add(self.len()).ok_or(overflow)?;
        Ok(Self {
            start: self.end,
            end,
        })
    }
}
