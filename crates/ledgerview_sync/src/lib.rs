//! # ledgerview sync
//!
//! Remote collection loading and refresh for ledgerview.
//!
//! This crate provides:
//! - Range fetcher abstraction (one bounded query per call)
//! - Chunked collection loading until the remote signals completion
//! - Synced entities (fetch state machine, polling, coalesced refresh)
//! - Detail lookups for pages of record identifiers
//! - HTTP range fetcher over a pluggable client
//!
//! ## Architecture
//!
//! A [`SyncedEntity`] owns a key and a [`CollectionSource`]. Each fetch
//! cycle asks the source for the full collection of the current key; the
//! usual source is a [`ChunkedCollectionLoader`] walking a [`RangeFetcher`]
//! chunk by chunk:
//! 1. Request `[offset, offset + chunk_size)`
//! 2. Append the page, dropping repeated identifiers
//! 3. Stop when the remote reports completion, otherwise advance
//!
//! ## Key Invariants
//!
//! - At most one fetch cycle per entity is in flight
//! - Chunk ranges are contiguous and strictly increasing
//! - A failed chunk fails the whole load; partial results are discarded
//! - Results of a superseded key are never applied
//! - A failed cycle keeps the last good collection visible

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod entity;
mod error;
mod fetcher;
mod http;
mod loader;
mod lookup;
mod state;

pub use config::{
    ClientConfig, EntityConfig, FailurePolicy, LoaderConfig, NetworkConfig, DEFAULT_CHUNK_SIZE,
    DEFAULT_PAGE_SIZE, DEFAULT_REFRESH_DELAY,
};
pub use entity::SyncedEntity;
pub use error::{SyncError, SyncResult};
pub use fetcher::{MockRangeFetcher, RangeFetcher};
pub use http::{HttpRangeFetcher, LoopbackClient, LoopbackServer, QueryClient, RANGE_ENDPOINT};
pub use loader::{ChunkedCollectionLoader, CollectionSource, FnSource, LoadReport};
pub use lookup::{lookup_ids, RecordLookup};
pub use state::{CycleTrigger, DisplayStatus, EntitySnapshot, EntityStats, FetchState};
