//! Range fetcher abstraction.

use crate::error::{SyncError, SyncResult};
use async_trait::async_trait;
use ledgerview_protocol::{RangeCursor, RangePage, Record};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Issues one bounded query `[start, end)` for an entity key.
///
/// Implementations perform no retries. Any failure to complete the query
/// is returned as an error; `RangePage::is_complete` must reflect the
/// remote's global completion signal, not whether this page was non-empty.
#[async_trait]
pub trait RangeFetcher<K: Sync>: Send + Sync {
    /// Fetches the records in `cursor` for `key`.
    async fn fetch_range(&self, key: &K, cursor: RangeCursor) -> SyncResult<RangePage>;
}

#[async_trait]
impl<K, F> RangeFetcher<K> for Arc<F>
where
    K: Sync,
    F: RangeFetcher<K> + ?Sized,
{
    async fn fetch_range(&self, key: &K, cursor: RangeCursor) -> SyncResult<RangePage> {
        (**self).fetch_range(key, cursor).await
    }
}

/// A mock fetcher serving one in-memory record list for any key.
///
/// Offsets index directly into the list; a page is complete once its end
/// reaches the list length.
#[derive(Debug)]
pub struct MockRangeFetcher {
    records: Mutex<Vec<Record>>,
    fail_on_call: Mutex<Option<(usize, SyncError)>>,
    calls: Mutex<Vec<RangeCursor>>,
    connected: AtomicBool,
}

impl MockRangeFetcher {
    /// Creates a mock serving `records`.
    pub fn new(records: Vec<Record>) -> Self {
        Self {
            records: Mutex::new(records),
            fail_on_call: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
            connected: AtomicBool::new(true),
        }
    }

    /// Replaces the served records.
    pub fn set_records(&self, records: Vec<Record>) {
        *self.records.lock() = records;
    }

    /// Makes the `call`-th fetch (0-indexed) fail with `error`.
    pub fn fail_on_call(&self, call: usize, error: SyncError) {
        *self.fail_on_call.lock() = Some((call, error));
    }

    /// Sets the connected state.
    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    /// Cursors requested so far, in order.
    pub fn calls(&self) -> Vec<RangeCursor> {
        self.calls.lock().clone()
    }

    /// Number of fetches issued.
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    fn serve(&self, cursor: RangeCursor) -> SyncResult<RangePage> {
        let call = {
            let mut calls = self.calls.lock();
            calls.push(cursor);
            calls.len() - 1
        };

        if !self.connected.load(Ordering::SeqCst) {
            return Err(SyncError::NotConnected);
        }
        if let Some((fail_at, error)) = self.fail_on_call.lock().as_ref() {
            if *fail_at == call {
                return Err(error.clone());
            }
        }

        let records = self.records.lock();
        let len = records.len() as u64;
        let start = cursor.start().min(len) as usize;
        let end = cursor.end().min(len) as usize;
        Ok(RangePage::new(
            records[start..end].to_vec(),
            cursor.end() >= len,
        ))
    }
}

impl Default for MockRangeFetcher {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

#[async_trait]
impl<K: Sync> RangeFetcher<K> for MockRangeFetcher {
    async fn fetch_range(&self, _key: &K, cursor: RangeCursor) -> SyncResult<RangePage> {
        self.serve(cursor)
    }
}
