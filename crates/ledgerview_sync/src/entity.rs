//! Synced entities: a cached collection kept fresh by periodic re-fetch.

use crate::config::{EntityConfig, FailurePolicy};
use crate::error::{SyncError, SyncResult};
use crate::loader::CollectionSource;
use crate::state::{CycleTrigger, DisplayStatus, EntitySnapshot, EntityStats, FetchState};
use ledgerview_protocol::Collection;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;

type Outcome = SyncResult<Arc<Collection>>;

/// A remote collection bound to a key, refreshed on mount, on key change,
/// on request, and by a polling timer.
///
/// At most one fetch cycle runs at a time. A refresh requested while a
/// cycle is running joins that cycle instead of starting another. When the
/// key changes, the running cycle's result is discarded on arrival and a
/// new cycle starts right away for the new key.
///
/// The entity spawns its cycles and its polling loop on the ambient Tokio
/// runtime; `set_key`, `mount`, `refresh` and `start_polling` panic when
/// called outside one.
pub struct SyncedEntity<K, S> {
    inner: Arc<Inner<K, S>>,
    poller: Mutex<Option<JoinHandle<()>>>,
}

struct Inner<K, S> {
    name: String,
    config: EntityConfig,
    source: S,
    core: Mutex<Core<K>>,
    snapshot: watch::Sender<EntitySnapshot<K>>,
    observed: watch::Sender<bool>,
}

struct Core<K> {
    key: Option<K>,
    next_cycle: u64,
    in_flight: Option<InFlight>,
    state: FetchState,
    collection: Option<Arc<Collection>>,
    auto_refresh: bool,
    stats: EntityStats,
}

struct InFlight {
    cycle: u64,
    done: watch::Sender<Option<Outcome>>,
}

impl<K, S> SyncedEntity<K, S>
where
    K: Clone + PartialEq + fmt::Debug + Send + Sync + 'static,
    S: CollectionSource<K> + 'static,
{
    /// Creates an unmounted entity. Nothing is fetched until a key is set.
    pub fn new(name: impl Into<String>, source: S, config: EntityConfig) -> Self {
        let core = Core {
            key: None,
            next_cycle: 0,
            in_flight: None,
            state: FetchState::Idle,
            collection: None,
            auto_refresh: true,
            stats: EntityStats::default(),
        };
        let (snapshot, _) = watch::channel(EntitySnapshot::new());
        let (observed, _) = watch::channel(true);

        Self {
            inner: Arc::new(Inner {
                name: name.into(),
                config,
                source,
                core: Mutex::new(core),
                snapshot,
                observed,
            }),
            poller: Mutex::new(None),
        }
    }

    /// Returns the entity name used in logs.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Returns the entity configuration.
    pub fn config(&self) -> &EntityConfig {
        &self.inner.config
    }

    /// Returns the collection source.
    pub fn source(&self) -> &S {
        &self.inner.source
    }

    /// Sets the key and starts polling.
    pub fn mount(&self, key: K) {
        self.set_key(key);
        self.start_polling();
    }

    /// Sets the key. Setting the current key again does nothing; any other
    /// value supersedes the running cycle and starts a new one.
    pub fn set_key(&self, key: K) {
        let mut core = self.inner.core.lock();
        if core.key.as_ref() == Some(&key) {
            return;
        }

        let trigger = if core.key.is_none() {
            CycleTrigger::Mount
        } else {
            CycleTrigger::KeyChange
        };

        if let Some(flight) = core.in_flight.take() {
            tracing::debug!(entity = %self.inner.name, cycle = flight.cycle, "superseding running cycle");
            flight.done.send_replace(Some(Err(SyncError::Superseded)));
        }

        tracing::info!(entity = %self.inner.name, ?key, ?trigger, "entity key set");
        core.key = Some(key.clone());
        core.state = FetchState::Idle;
        core.collection = None;
        core.auto_refresh = true;

        self.inner.begin_cycle(&mut core, key, trigger);
    }

    /// Returns the current key.
    pub fn key(&self) -> Option<K> {
        self.inner.core.lock().key.clone()
    }

    /// Requests a refresh and waits for the cycle that serves it.
    ///
    /// Joins the running cycle if there is one. The outcome is reported to
    /// the caller whatever the failure policy; it also becomes the state
    /// observers see, unless the key changes first, in which case the
    /// caller gets [`SyncError::Superseded`].
    pub async fn refresh(&self) -> SyncResult<Arc<Collection>> {
        let done = self.inner.request(CycleTrigger::Manual)?;
        wait_outcome(done).await
    }

    /// Waits until the current cycle settles and returns its outcome.
    pub async fn settled(&self) -> SyncResult<Arc<Collection>> {
        let mut snapshots = self.inner.snapshot.subscribe();
        let state = snapshots
            .wait_for(|s| s.key.is_none() || s.state.is_settled())
            .await
            .map(|s| s.state.clone())
            .map_err(|_| SyncError::Superseded)?;

        match state {
            FetchState::Succeeded { collection, .. } => Ok(collection),
            FetchState::Failed { error, .. } => Err(error),
            _ => Err(SyncError::NoKey),
        }
    }

    /// Marks the entity as observed or not. Automatic polling only fires
    /// while observed; a timer that expired while hidden fires on reveal.
    pub fn set_observed(&self, observed: bool) {
        let previous = self.inner.observed.send_replace(observed);
        if previous != observed {
            tracing::debug!(entity = %self.inner.name, observed, "observation changed");
        }
    }

    /// Returns whether the entity is observed.
    pub fn is_observed(&self) -> bool {
        *self.inner.observed.borrow()
    }

    /// Starts the automatic polling loop if it is not running.
    pub fn start_polling(&self) {
        let mut poller = self.poller.lock();
        if poller.as_ref().is_some_and(|h| !h.is_finished()) {
            return;
        }
        *poller = Some(tokio::spawn(poll_loop(Arc::clone(&self.inner))));
    }

    /// Stops the automatic polling loop.
    pub fn stop_polling(&self) {
        if let Some(handle) = self.poller.lock().take() {
            handle.abort();
        }
    }

    /// Returns true while the polling loop runs.
    pub fn is_polling(&self) -> bool {
        self.poller
            .lock()
            .as_ref()
            .is_some_and(|h| !h.is_finished())
    }

    /// Subscribes to state snapshots.
    pub fn subscribe(&self) -> watch::Receiver<EntitySnapshot<K>> {
        self.inner.snapshot.subscribe()
    }

    /// Returns the latest snapshot.
    pub fn snapshot(&self) -> EntitySnapshot<K> {
        self.inner.snapshot.borrow().clone()
    }

    /// Returns the current fetch state.
    pub fn state(&self) -> FetchState {
        self.inner.core.lock().state.clone()
    }

    /// Returns the last good collection for the current key.
    pub fn collection(&self) -> Option<Arc<Collection>> {
        self.inner.core.lock().collection.clone()
    }

    /// Returns what a consumer should render.
    pub fn display(&self) -> DisplayStatus {
        self.inner.snapshot.borrow().display()
    }

    /// Returns cycle statistics.
    pub fn stats(&self) -> EntityStats {
        self.inner.core.lock().stats.clone()
    }
}

impl<K, S> Drop for SyncedEntity<K, S> {
    fn drop(&mut self) {
        if let Some(handle) = self.poller.get_mut().take() {
            handle.abort();
        }
    }
}

impl<K, S> Inner<K, S>
where
    K: Clone + PartialEq + fmt::Debug + Send + Sync + 'static,
    S: CollectionSource<K> + 'static,
{
    /// Starts a cycle, or joins the running one.
    fn request(
        self: &Arc<Self>,
        trigger: CycleTrigger,
    ) -> SyncResult<watch::Receiver<Option<Outcome>>> {
        let mut core = self.core.lock();
        let key = core.key.clone().ok_or(SyncError::NoKey)?;

        let joined = core
            .in_flight
            .as_ref()
            .map(|f| (f.cycle, f.done.subscribe()));
        if let Some((cycle, done)) = joined {
            core.stats.coalesced_refreshes += 1;
            tracing::debug!(entity = %self.name, cycle, ?trigger, "joined running cycle");
            return Ok(done);
        }

        Ok(self.begin_cycle(&mut core, key, trigger))
    }

    fn begin_cycle(
        self: &Arc<Self>,
        core: &mut Core<K>,
        key: K,
        trigger: CycleTrigger,
    ) -> watch::Receiver<Option<Outcome>> {
        core.next_cycle += 1;
        let cycle = core.next_cycle;
        let (done, rx) = watch::channel(None);

        core.in_flight = Some(InFlight { cycle, done });
        core.state = FetchState::InFlight {
            cycle,
            trigger,
            since: Instant::now(),
        };
        if trigger != CycleTrigger::Automatic {
            core.auto_refresh = true;
        }
        core.stats.cycles_started += 1;
        self.publish(core);

        tracing::debug!(entity = %self.name, cycle, ?trigger, "cycle started");

        let inner = Arc::clone(self);
        tokio::spawn(async move {
            let result = inner.source.fetch_collection(&key).await;
            inner.complete(cycle, result);
        });

        rx
    }

    fn complete(&self, cycle: u64, result: SyncResult<Collection>) {
        let mut core = self.core.lock();
        let flight = match core.in_flight.take() {
            Some(flight) if flight.cycle == cycle => flight,
            other => {
                core.in_flight = other;
                core.stats.discarded_results += 1;
                tracing::debug!(entity = %self.name, cycle, "discarded result of superseded cycle");
                return;
            }
        };

        let at = Instant::now();
        let outcome = match result {
            Ok(collection) => {
                let collection = Arc::new(collection);
                tracing::debug!(entity = %self.name, cycle, records = collection.len(), "cycle succeeded");
                core.state = FetchState::Succeeded {
                    cycle,
                    collection: Arc::clone(&collection),
                    at,
                };
                core.collection = Some(Arc::clone(&collection));
                core.stats.cycles_succeeded += 1;
                core.stats.last_success = Some(at);
                Ok(collection)
            }
            Err(error) => {
                tracing::warn!(entity = %self.name, cycle, %error, "cycle failed");
                core.state = FetchState::Failed {
                    cycle,
                    error: error.clone(),
                    at,
                };
                core.stats.cycles_failed += 1;
                core.stats.last_error = Some(error.to_string());
                if self.config.failure_policy == FailurePolicy::StopUntilManual {
                    core.auto_refresh = false;
                }
                Err(error)
            }
        };

        self.publish(&core);
        drop(core);
        flight.done.send_replace(Some(outcome));
    }

    fn publish(&self, core: &Core<K>) {
        self.snapshot.send_replace(EntitySnapshot {
            key: core.key.clone(),
            state: core.state.clone(),
            collection: core.collection.clone(),
            auto_refresh: core.auto_refresh,
        });
    }
}

async fn wait_outcome(mut done: watch::Receiver<Option<Outcome>>) -> Outcome {
    let outcome = done.wait_for(Option::is_some).await.map(|o| o.clone());
    match outcome {
        Ok(Some(outcome)) => outcome,
        _ => Err(SyncError::Superseded),
    }
}

async fn poll_loop<K, S>(inner: Arc<Inner<K, S>>)
where
    K: Clone + PartialEq + fmt::Debug + Send + Sync + 'static,
    S: CollectionSource<K> + 'static,
{
    let mut snapshots = inner.snapshot.subscribe();
    let mut observed = inner.observed.subscribe();

    loop {
        let settled = snapshots
            .wait_for(|s| s.auto_refresh && s.state.is_settled())
            .await
            .map(|s| s.state.cycle().zip(s.state.settled_at()));
        let Ok(Some((cycle, settled_at))) = settled else {
            return;
        };

        tokio::time::sleep_until(settled_at + inner.config.refresh_delay).await;

        if observed.wait_for(|o| *o).await.is_err() {
            return;
        }

        {
            let core = inner.core.lock();
            if core.state.cycle() != Some(cycle) || !core.auto_refresh || core.in_flight.is_some()
            {
                continue;
            }
        }

        if let Err(error) = inner.request(CycleTrigger::Automatic) {
            tracing::debug!(entity = %inner.name, %error, "automatic refresh skipped");
        }
    }
}
