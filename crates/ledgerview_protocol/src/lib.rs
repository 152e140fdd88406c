//! # ledgerview Protocol
//!
//! Record, collection and range-query types for ledgerview.
//!
//! This crate provides:
//! - `FieldValue`, `RecordId` and `Record` for opaque, id-keyed records
//! - `Collection` and `CollectionBuilder` (ordered, duplicate-free)
//! - `RangeCursor` for half-open `[start, end)` chunk queries
//! - Range request/response messages and their JSON codec
//!
//! This is a pure protocol crate with no I/O operations.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod messages;
mod range;
mod record;
mod value;

pub use error::{ProtocolError, ProtocolResult};
pub use messages::{RangePage, RangeRequest, RangeResponse, RemoteError, RemoteErrorKind};
pub use range::RangeCursor;
pub use record::{Collection, CollectionBuilder, Record, RecordId, ID_FIELD};
pub use value::FieldValue;
