//! Fetch state machine for synced entities.

use crate::error::SyncError;
use ledgerview_protocol::Collection;
use std::sync::Arc;
use tokio::time::Instant;

/// What started a fetch cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CycleTrigger {
    /// The first key was set.
    Mount,
    /// The key changed to a different value.
    KeyChange,
    /// A caller requested a refresh.
    Manual,
    /// The polling timer fired.
    Automatic,
}

/// State of the current (or most recent) fetch cycle.
///
/// Transitions: `Idle -> InFlight`, `InFlight -> Succeeded | Failed`,
/// `Succeeded | Failed -> InFlight`. A key change resets to `Idle` before
/// starting the next cycle.
#[derive(Debug, Clone)]
pub enum FetchState {
    /// No cycle has run for the current key.
    Idle,
    /// A cycle is running.
    InFlight {
        /// Cycle number.
        cycle: u64,
        /// What started it.
        trigger: CycleTrigger,
        /// When it started.
        since: Instant,
    },
    /// The last cycle produced a collection.
    Succeeded {
        /// Cycle number.
        cycle: u64,
        /// The fetched collection.
        collection: Arc<Collection>,
        /// When it settled.
        at: Instant,
    },
    /// The last cycle failed.
    Failed {
        /// Cycle number.
        cycle: u64,
        /// The failure.
        error: SyncError,
        /// When it settled.
        at: Instant,
    },
}

impl FetchState {
    /// Returns true while a cycle is running.
    pub fn is_in_flight(&self) -> bool {
        matches!(self, FetchState::InFlight { .. })
    }

    /// Returns true once a cycle has finished, successfully or not.
    pub fn is_settled(&self) -> bool {
        self.settled_at().is_some()
    }

    /// When the last cycle settled.
    pub fn settled_at(&self) -> Option<Instant> {
        match self {
            FetchState::Succeeded { at, .. } | FetchState::Failed { at, .. } => Some(*at),
            _ => None,
        }
    }

    /// Cycle number, if any cycle has started.
    pub fn cycle(&self) -> Option<u64> {
        match self {
            FetchState::Idle => None,
            FetchState::InFlight { cycle, .. }
            | FetchState::Succeeded { cycle, .. }
            | FetchState::Failed { cycle, .. } => Some(*cycle),
        }
    }

    /// The error of a failed cycle.
    pub fn error(&self) -> Option<&SyncError> {
        match self {
            FetchState::Failed { error, .. } => Some(error),
            _ => None,
        }
    }

    /// Short state name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            FetchState::Idle => "idle",
            FetchState::InFlight { .. } => "in_flight",
            FetchState::Succeeded { .. } => "succeeded",
            FetchState::Failed { .. } => "failed",
        }
    }
}

/// What a consumer should render for an entity.
#[derive(Debug, Clone)]
pub enum DisplayStatus {
    /// Nothing to show yet.
    Loading,
    /// Fresh data.
    Ready(Arc<Collection>),
    /// Last good data, with the error of a later cycle.
    Stale {
        /// Last good collection.
        collection: Arc<Collection>,
        /// Error of the most recent cycle.
        error: SyncError,
    },
    /// No data, only an error.
    Unavailable(SyncError),
}

impl DisplayStatus {
    /// The collection to render, if any.
    pub fn collection(&self) -> Option<&Arc<Collection>> {
        match self {
            DisplayStatus::Ready(c) | DisplayStatus::Stale { collection: c, .. } => Some(c),
            _ => None,
        }
    }
}

/// Point-in-time view of a synced entity, published on every transition.
#[derive(Debug, Clone)]
pub struct EntitySnapshot<K> {
    /// Current key.
    pub key: Option<K>,
    /// Current fetch state.
    pub state: FetchState,
    /// Last good collection for the current key.
    pub collection: Option<Arc<Collection>>,
    /// Whether automatic polling is armed.
    pub auto_refresh: bool,
}

impl<K> EntitySnapshot<K> {
    pub(crate) fn new() -> Self {
        Self {
            key: None,
            state: FetchState::Idle,
            collection: None,
            auto_refresh: true,
        }
    }

    /// Derives what to render.
    ///
    /// A failure after a success keeps the old data visible; an in-flight
    /// refresh does too.
    pub fn display(&self) -> DisplayStatus {
        match (&self.state, &self.collection) {
            (FetchState::Failed { error, .. }, Some(c)) => DisplayStatus::Stale {
                collection: Arc::clone(c),
                error: error.clone(),
            },
            (FetchState::Failed { error, .. }, None) => DisplayStatus::Unavailable(error.clone()),
            (_, Some(c)) => DisplayStatus::Ready(Arc::clone(c)),
            (_, None) => DisplayStatus::Loading,
        }
    }
}

/// Counters about an entity's fetch cycles.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntityStats {
    /// Cycles started.
    pub cycles_started: u64,
    /// Cycles whose result was applied as a success.
    pub cycles_succeeded: u64,
    /// Cycles whose result was applied as a failure.
    pub cycles_failed: u64,
    /// Results dropped because the key changed while in flight.
    pub discarded_results: u64,
    /// Refresh requests joined onto a running cycle.
    pub coalesced_refreshes: u64,
    /// Last successful settle time.
    pub last_success: Option<Instant>,
    /// Last applied error message.
    pub last_error: Option<String>,
}
