//! # ledgerview testkit
//!
//! Test utilities for ledgerview.
//!
//! This crate provides:
//! - A simulated remote ledger with latency, gating and failure injection
//! - Moment fixtures as records and as JSON files
//! - Property-based test generators using proptest
//! - Stress runs for concurrent loads and refreshes
//!
//! ## Usage
//!
//! ```rust,ignore
//! use ledgerview_testkit::prelude::*;
//!
//! #[tokio::test]
//! async fn loads_everything() {
//!     let ledger = Arc::new(SimulatedLedger::new().with_collection("0x01", moments(25)));
//!     let loader = ChunkedCollectionLoader::new(ledger, LoaderConfig::new(10)).unwrap();
//!     assert_eq!(loader.load(&"0x01".to_string()).await.unwrap().len(), 25);
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod ledger;
pub mod stress;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::ledger::*;
    pub use crate::stress::*;
}

pub use fixtures::*;
pub use generators::*;
pub use ledger::*;
pub use stress::*;
