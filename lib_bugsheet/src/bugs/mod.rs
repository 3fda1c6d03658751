//! # Bugs Core Module
//!
//! The reconciliation core. Components, leaves first:
//!
//! - **`record`**: the immutable `Bug` record and the tracker `BugQuery`.
//! - **`tracker`**: the `BugTracker` capability the reconciler fetches through.
//! - **`classifier`**: partitions a fetch into a per-team `BugMap`.
//! - **`bugmap`**: the per-team query and filter engine.
//! - **`store`**: the `AggregateStore` holding the current `Snapshot`.
//! - **`reconciler`**: the periodic fetch → classify → swap loop.
//!
//! Readers only ever touch `AggregateStore::read()` and the `BugMap` methods;
//! everything else belongs to the reconciler task.

/// Bug records and tracker queries.
pub mod record;
/// The fetch capability.
pub mod tracker;
/// Team classification of fetched bugs.
pub mod classifier;
/// Per-team counts and filters.
pub mod bugmap;
/// Atomically swapped snapshot storage.
pub mod store;
/// The periodic reconciliation loop.
pub mod reconciler;

// --- Public API Re-exports ---
pub use bugmap::{BugMap, UPCOMING_SPRINT};
pub use classifier::classify;
pub use reconciler::{
    ChannelTicker, IntervalTicker, LoopState, ReconcileError, Reconciler, StatusHandle, Ticker,
    DEFAULT_INTERVAL,
};
pub use record::{AdvancedQuery, Bug, BugQuery, LOW_SEVERITY};
pub use store::{AggregateStore, Snapshot};
pub use tracker::{BugTracker, FetchError};
