//! # ledgerview view
//!
//! Display projections over fetched collections.
//!
//! This crate provides:
//! - Page arithmetic with ceiling page counts ([`page_count`], [`page_slice`])
//! - Case-insensitive prefix filtering on one field ([`FilterSpec`])
//! - Stable single-key sorting ([`SortSpec`], [`SortScope`])
//! - [`PagedView`], combining the three over a shared [`Collection`]
//!
//! Filtering is applied before paging; the filtered set is what gets paged.
//! Nothing here suspends or mutates the collection.
//!
//! [`Collection`]: ledgerview_protocol::Collection

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod filter;
mod paging;
mod sort;
mod view;

pub use error::{ViewError, ViewResult};
pub use filter::{default_resolver, FieldResolver, FilterSpec};
pub use paging::{page_count, page_slice, PageWindow};
pub use sort::{SortDirection, SortScope, SortSpec};
pub use view::PagedView;
