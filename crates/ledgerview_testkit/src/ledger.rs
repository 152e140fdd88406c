//! A simulated remote ledger.
//!
//! [`SimulatedLedger`] holds one record list per key and answers range
//! queries the way the query service does: offsets index into the list and
//! a page is complete once its end reaches the list length. Latency,
//! request gating, failure injection and a never-completing mode let tests
//! reproduce the remote's failure modes, and concurrency counters let them
//! check that callers never overlap requests.

use async_trait::async_trait;
use ledgerview_protocol::{Record, RecordId, RangeCursor, RangePage, RangeRequest, RangeResponse};
use ledgerview_sync::{
    LoopbackServer, RangeFetcher, RecordLookup, SyncError, SyncResult, RANGE_ENDPOINT,
};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::watch;

/// One range request as the ledger saw it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerRequest {
    /// Entity key.
    pub key: String,
    /// Requested range.
    pub cursor: RangeCursor,
}

#[derive(Debug, Clone)]
struct FailRule {
    start: Option<u64>,
    error: SyncError,
    once: bool,
}

/// An in-memory stand-in for the remote query service.
pub struct SimulatedLedger {
    collections: RwLock<HashMap<String, Vec<Record>>>,
    latency: Mutex<Duration>,
    fail_rules: Mutex<Vec<FailRule>>,
    never_complete: AtomicBool,
    gate: watch::Sender<bool>,
    requests: Mutex<Vec<LedgerRequest>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl SimulatedLedger {
    /// Creates an empty ledger with no latency.
    pub fn new() -> Self {
        let (gate, _) = watch::channel(true);
        Self {
            collections: RwLock::new(HashMap::new()),
            latency: Mutex::new(Duration::ZERO),
            fail_rules: Mutex::new(Vec::new()),
            never_complete: AtomicBool::new(false),
            gate,
            requests: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    /// Adds a collection (builder style).
    #[must_use]
    pub fn with_collection(self, key: impl Into<String>, records: Vec<Record>) -> Self {
        self.insert(key, records);
        self
    }

    /// Sets the per-request latency (builder style).
    #[must_use]
    pub fn with_latency(self, latency: Duration) -> Self {
        self.set_latency(latency);
        self
    }

    /// Replaces the collection stored under `key`.
    pub fn insert(&self, key: impl Into<String>, records: Vec<Record>) {
        self.collections.write().insert(key.into(), records);
    }

    /// Appends records to the collection under `key`, creating it if needed.
    pub fn append(&self, key: &str, records: impl IntoIterator<Item = Record>) {
        self.collections
            .write()
            .entry(key.to_string())
            .or_default()
            .extend(records);
    }

    /// Removes the collection under `key`; later requests get not-found.
    pub fn remove(&self, key: &str) -> Option<Vec<Record>> {
        self.collections.write().remove(key)
    }

    /// Number of records stored under `key`.
    pub fn len_of(&self, key: &str) -> Option<usize> {
        self.collections.read().get(key).map(Vec::len)
    }

    /// Sets the per-request latency.
    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock() = latency;
    }

    /// Fails every request whose range starts at `start`.
    pub fn fail_at(&self, start: u64, error: SyncError) {
        self.fail_rules.lock().push(FailRule {
            start: Some(start),
            error,
            once: false,
        });
    }

    /// Fails the next request only.
    pub fn fail_next(&self, error: SyncError) {
        self.fail_rules.lock().push(FailRule {
            start: None,
            error,
            once: true,
        });
    }

    /// Fails every request until [`SimulatedLedger::clear_failures`].
    pub fn fail_always(&self, error: SyncError) {
        self.fail_rules.lock().push(FailRule {
            start: None,
            error,
            once: false,
        });
    }

    /// Removes all failure rules.
    pub fn clear_failures(&self) {
        self.fail_rules.lock().clear();
    }

    /// Makes every page report more records to come.
    pub fn set_never_complete(&self, never_complete: bool) {
        self.never_complete.store(never_complete, Ordering::SeqCst);
    }

    /// Holds new and waiting requests until [`SimulatedLedger::resume`].
    pub fn pause(&self) {
        self.gate.send_replace(false);
    }

    /// Releases held requests.
    pub fn resume(&self) {
        self.gate.send_replace(true);
    }

    /// Every request received so far, in arrival order.
    pub fn requests(&self) -> Vec<LedgerRequest> {
        self.requests.lock().clone()
    }

    /// Number of requests received.
    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }

    /// Number of requests received for `key`.
    pub fn request_count_for(&self, key: &str) -> usize {
        self.requests.lock().iter().filter(|r| r.key == key).count()
    }

    /// Number of requests currently being served.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Highest number of requests ever served at once.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Clears the request log and the concurrency high-water mark.
    pub fn reset_stats(&self) {
        self.requests.lock().clear();
        self.max_in_flight
            .store(self.in_flight.load(Ordering::SeqCst), Ordering::SeqCst);
    }

    /// Serves one range request.
    pub async fn serve(&self, key: &str, cursor: RangeCursor) -> SyncResult<RangePage> {
        self.requests.lock().push(LedgerRequest {
            key: key.to_string(),
            cursor,
        });
        let _guard = InFlightGuard::enter(self);

        let mut gate = self.gate.subscribe();
        if gate.wait_for(|open| *open).await.is_err() {
            return Err(SyncError::transport_retryable("ledger shut down"));
        }
        let latency = *self.latency.lock();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        if let Some(error) = self.take_failure(cursor) {
            return Err(error);
        }

        let collections = self.collections.read();
        let records = collections
            .get(key)
            .ok_or_else(|| SyncError::not_found(key))?;
        let len = records.len() as u64;
        let start = cursor.start().min(len) as usize;
        let end = cursor.end().min(len) as usize;
        let is_complete = !self.never_complete.load(Ordering::SeqCst) && cursor.end() >= len;

        Ok(RangePage::new(records[start..end].to_vec(), is_complete))
    }

    fn take_failure(&self, cursor: RangeCursor) -> Option<SyncError> {
        let mut rules = self.fail_rules.lock();
        let index = rules
            .iter()
            .position(|r| r.start.is_none_or(|s| s == cursor.start()))?;
        if rules[index].once {
            Some(rules.remove(index).error)
        } else {
            Some(rules[index].error.clone())
        }
    }

    async fn handle_range(&self, body: &[u8]) -> Result<RangeResponse, String> {
        let request = RangeRequest::decode(body).map_err(|e| format!("bad request: {e}"))?;
        let cursor = request.cursor().map_err(|e| format!("bad request: {e}"))?;

        match self.serve(&request.key, cursor).await {
            Ok(page) => Ok(page.into()),
            Err(SyncError::NotFound { key }) => Ok(RangeResponse::not_found(format!(
                "no collection for {key}"
            ))),
            Err(SyncError::Transport { message, .. }) => Err(message),
            Err(other) => Ok(RangeResponse::internal(other.to_string())),
        }
    }
}

impl Default for SimulatedLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SimulatedLedger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimulatedLedger")
            .field("keys", &self.collections.read().len())
            .field("requests", &self.request_count())
            .field("in_flight", &self.in_flight())
            .finish_non_exhaustive()
    }
}

struct InFlightGuard<'a> {
    ledger: &'a SimulatedLedger,
}

impl<'a> InFlightGuard<'a> {
    fn enter(ledger: &'a SimulatedLedger) -> Self {
        let now = ledger.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        ledger.max_in_flight.fetch_max(now, Ordering::SeqCst);
        Self { ledger }
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.ledger.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl<K> RangeFetcher<K> for SimulatedLedger
where
    K: fmt::Display + Sync,
{
    async fn fetch_range(&self, key: &K, cursor: RangeCursor) -> SyncResult<RangePage> {
        self.serve(&key.to_string(), cursor).await
    }
}

#[async_trait]
impl<K> RecordLookup<K> for SimulatedLedger
where
    K: fmt::Display + Sync,
{
    async fn lookup(&self, key: &K, ids: &[RecordId]) -> SyncResult<Vec<Record>> {
        let key = key.to_string();
        let collections = self.collections.read();
        let records = collections
            .get(&key)
            .ok_or_else(|| SyncError::not_found(key.as_str()))?;
        Ok(records
            .iter()
            .filter(|r| ids.contains(r.id()))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl LoopbackServer for SimulatedLedger {
    async fn handle_post(&self, path: &str, body: &[u8]) -> Result<Vec<u8>, String> {
        if path != RANGE_ENDPOINT {
            return Err(format!("unknown endpoint: {path}"));
        }
        let response = self.handle_range(body).await?;
        response
            .encode()
            .map_err(|e| format!("failed to encode response: {e}"))
    }
}
