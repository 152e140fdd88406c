//! Range query messages.
//!
//! These are the JSON bodies exchanged by the reference HTTP fetcher.
//! The ledger's own script protocol is out of scope; a query service
//! fronting it only has to accept a [`RangeRequest`] and answer with a
//! [`RangeResponse`].

use crate::error::ProtocolResult;
use crate::range::RangeCursor;
use crate::record::Record;
use serde::{Deserialize, Serialize};

/// A bounded query for one chunk of an entity's collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeRequest {
    /// Entity key (account address, set id, ...).
    pub key: String,
    /// Range start (inclusive).
    pub start: u64,
    /// Range end (exclusive).
    pub end: u64,
}

impl RangeRequest {
    /// Creates a request for one cursor position.
    pub fn new(key: impl Into<String>, cursor: RangeCursor) -> Self {
        Self {
            key: key.into(),
            start: cursor.start(),
            end: cursor.end(),
        }
    }

    /// Returns the request's range as a validated cursor.
    pub fn cursor(&self) -> ProtocolResult<RangeCursor> {
        RangeCursor::new(self.start, self.end)
    }

    /// Encodes to JSON.
    pub fn encode(&self) -> ProtocolResult<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Decodes from JSON.
    pub fn decode(bytes: &[u8]) -> ProtocolResult<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// One page of records returned for a range query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangePage {
    /// Records in remote order.
    pub records: Vec<Record>,
    /// True once the remote has no records beyond those returned so far
    /// across the whole walk (not just this page).
    pub is_complete: bool,
}

impl RangePage {
    /// Creates a page.
    pub fn new(records: Vec<Record>, is_complete: bool) -> Self {
        Self {
            records,
            is_complete,
        }
    }

    /// A page that ends the walk.
    pub fn complete(records: Vec<Record>) -> Self {
        Self::new(records, true)
    }

    /// A page with more to follow.
    pub fn partial(records: Vec<Record>) -> Self {
        Self::new(records, false)
    }
}

/// Failure category reported by the remote side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemoteErrorKind {
    /// The entity key does not resolve to anything.
    NotFound,
    /// The remote failed while executing the query.
    Internal,
}

/// Error body returned by the remote side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteError {
    /// Failure category.
    pub kind: RemoteErrorKind,
    /// Human readable message.
    pub message: String,
}

/// Response envelope for a range query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RangeResponse {
    /// A page of records.
    Page(RangePage),
    /// The query failed remotely.
    Error(RemoteError),
}

impl RangeResponse {
    /// Creates a not-found error response.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::Error(RemoteError {
            kind: RemoteErrorKind::NotFound,
            message: message.into(),
        })
    }

    /// Creates an internal error response.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Error(RemoteError {
            kind: RemoteErrorKind::Internal,
            message: message.into(),
        })
    }

    /// Encodes to JSON.
    pub fn encode(&self) -> ProtocolResult<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Decodes from JSON.
    pub fn decode(bytes: &[u8]) -> ProtocolResult<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

impl From<RangePage> for RangeResponse {
    fn from(page: RangePage) -> Self {
        RangeResponse::Page(page)
    }
}
