//! # Reconciler
//!
//! Keeps the [`AggregateStore`] in step with the tracker. Each cycle fetches
//! every matching bug, classifies the fetch, and swaps the result in as the
//! new current snapshot.
//!
//! ## Lifecycle:
//! 1.  **Bootstrap**: [`Reconciler::bootstrap`] runs the first cycle inline.
//!     The store only exists once that cycle succeeds, so a failed bootstrap
//!     means the service never starts.
//! 2.  **Idle**: the loop waits on its [`Ticker`] or the cancellation token.
//! 3.  **Reconciling**: fetch, classify, swap. Readers keep seeing the
//!     previous snapshot until the swap.
//! 4.  **Terminal**: the first failed cycle sends its error on the error
//!     channel exactly once and ends the loop. There is no retry; nothing is
//!     published for the failed cycle.
//! 5.  **Stopped**: cancellation or a closed tick source ends the loop cleanly.
//!
//! The ticker is injected so the schedule can be driven by hand in tests.
//! Production code uses [`IntervalTicker`], a fixed-period tokio interval
//! whose first tick fires one full period after start.

use super::classifier::classify;
use super::record::{Bug, BugQuery};
use super::store::{AggregateStore, Snapshot};
use super::tracker::{BugTracker, FetchError};
use crate::teams::TeamDirectory;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Period between reconciliations in the reference deployment.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(300);

/// Observable states of the reconciliation loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    /// Waiting for the next tick.
    Idle,
    /// A fetch, classify and swap is in progress.
    Reconciling,
    /// A cycle failed; the loop has exited and reported the error.
    Terminal,
    /// The loop was cancelled or its tick source closed.
    Stopped,
}

/// A failed reconciliation cycle.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// The tracker search failed.
    #[error("Reconciliation {generation} failed to fetch bugs: {source}")]
    Fetch {
        /// Generation the failed cycle would have produced.
        generation: u64,
        /// The tracker failure.
        #[source]
        source: FetchError,
    },
}

impl ReconcileError {
    /// Generation the failed cycle would have produced.
    pub fn generation(&self) -> u64 {
        match self {
            ReconcileError::Fetch { generation, .. } => *generation,
        }
    }
}

/// # Ticker
///
/// Source of reconciliation triggers. `tick` resolves when the next cycle is
/// due and returns `false` once no further ticks will ever arrive.
pub trait Ticker: Send {
    /// Waits for the next tick.
    fn tick(&mut self) -> impl Future<Output = bool> + Send;
}

/// Fixed-period ticker backed by `tokio::time::Interval`.
///
/// Missed ticks are delayed rather than bunched up, so a slow fetch never
/// causes back-to-back cycles.
#[derive(Debug)]
pub struct IntervalTicker {
    interval: Interval,
}

impl IntervalTicker {
    /// Ticks every `period`, starting one `period` from now.
    ///
    /// # Panics
    /// Panics if `period` is zero.
    pub fn new(period: Duration) -> Self {
        let mut interval = interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self { interval }
    }
}

impl Ticker for IntervalTicker {
    async fn tick(&mut self) -> bool {
        self.interval.tick().await;
        true
    }
}

/// Ticks once per message received. Closes when every sender is dropped.
#[derive(Debug)]
pub struct ChannelTicker {
    rx: mpsc::Receiver<()>,
}

impl ChannelTicker {
    /// Creates a ticker and the sender that drives it.
    pub fn new(buffer: usize) -> (mpsc::Sender<()>, Self) {
        let (tx, rx) = mpsc::channel(buffer);
        (tx, Self { rx })
    }
}

impl Ticker for ChannelTicker {
    async fn tick(&mut self) -> bool {
        self.rx.recv().await.is_some()
    }
}

/// Cloneable, read-only view of a reconciler's [`LoopState`].
#[derive(Debug, Clone)]
pub struct StatusHandle {
    state: Arc<RwLock<LoopState>>,
}

impl StatusHandle {
    fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(LoopState::Idle)),
        }
    }

    /// Current loop state.
    pub async fn current_state(&self) -> LoopState {
        *self.state.read().await
    }

    async fn set(&self, next: LoopState) {
        let mut state = self.state.write().await;
        if *state != next {
            log::debug!("Reconciler state: {:?} -> {:?}", *state, next);
            *state = next;
        }
    }
}

/// # Reconciler
///
/// Owns the tracker, the query and the only write access to the store.
pub struct Reconciler<T> {
    tracker: T,
    query: BugQuery,
    directory: Arc<TeamDirectory>,
    store: Arc<AggregateStore>,
    generation: u64,
    status: StatusHandle,
}

impl<T: BugTracker> Reconciler<T> {
    /// Runs the first reconciliation and creates the store around its result.
    ///
    /// # Errors
    /// Returns the fetch failure; no store is created in that case.
    pub async fn bootstrap(
        tracker: T,
        query: BugQuery,
        directory: Arc<TeamDirectory>,
    ) -> Result<Self, ReconcileError> {
        let snapshot = fetch_snapshot(&tracker, &query, &directory, 1).await?;
        log_reconciled(&snapshot);

        Ok(Self {
            tracker,
            query,
            directory,
            store: Arc::new(AggregateStore::new(snapshot)),
            generation: 1,
            status: StatusHandle::new(),
        })
    }

    /// Shared read handle on the store.
    pub fn store(&self) -> Arc<AggregateStore> {
        Arc::clone(&self.store)
    }

    /// Read-only view of the loop state.
    pub fn status(&self) -> StatusHandle {
        self.status.clone()
    }

    /// Generation of the last successfully published snapshot.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Runs one cycle and publishes its snapshot.
    ///
    /// On failure the store is left untouched.
    pub async fn reconcile(&mut self) -> Result<Arc<Snapshot>, ReconcileError> {
        let generation = self.generation + 1;
        let snapshot =
            fetch_snapshot(&self.tracker, &self.query, &self.directory, generation).await?;
        log_reconciled(&snapshot);

        self.store.swap(snapshot);
        self.generation = generation;
        Ok(self.store.read())
    }

    /// # Main Loop
    ///
    /// Reconciles on every tick until cancelled, until the ticker closes, or
    /// until a cycle fails. A failure is sent on `errors` once and ends the
    /// loop.
    pub async fn run<K: Ticker>(
        mut self,
        mut ticker: K,
        cancel: CancellationToken,
        errors: mpsc::UnboundedSender<ReconcileError>,
    ) {
        log::info!("Reconciler started at generation {}", self.generation);

        loop {
            self.status.set(LoopState::Idle).await;

            let fired = tokio::select! {
                biased;
                _ = cancel.cancelled() => false,
                alive = ticker.tick() => alive,
            };

            if !fired {
                self.status.set(LoopState::Stopped).await;
                log::info!("Reconciler stopped after generation {}", self.generation);
                return;
            }

            self.status.set(LoopState::Reconciling).await;
            if let Err(e) = self.reconcile().await {
                log::error!("{}. Halting reconciliation.", e);
                self.status.set(LoopState::Terminal).await;
                if errors.send(e).is_err() {
                    log::warn!("Reconcile error dropped: supervisor is no longer listening");
                }
                return;
            }
        }
    }

    /// Spawns [`Reconciler::run`] onto the tokio runtime.
    pub fn spawn<K>(
        self,
        ticker: K,
        cancel: CancellationToken,
        errors: mpsc::UnboundedSender<ReconcileError>,
    ) -> JoinHandle<()>
    where
        T: 'static,
        K: Ticker + 'static,
    {
        tokio::spawn(self.run(ticker, cancel, errors))
    }
}

async fn fetch_snapshot<T: BugTracker>(
    tracker: &T,
    query: &BugQuery,
    directory: &TeamDirectory,
    generation: u64,
) -> Result<Snapshot, ReconcileError> {
    let fetched = tracker
        .search(query)
        .await
        .map_err(|source| ReconcileError::Fetch { generation, source })?;

    let bugs: Vec<Arc<Bug>> = fetched.into_iter().map(Arc::new).collect();
    let bug_map = classify(&bugs, directory);
    Ok(Snapshot::new(generation, bugs, bug_map))
}

fn log_reconciled(snapshot: &Snapshot) {
    log::info!(
        "Successfully reconciled bug data. Generation:{} Teams:{} BugCount:{}",
        snapshot.generation(),
        snapshot.bug_map().len(),
        snapshot.bugs().len()
    );
}
