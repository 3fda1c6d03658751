//! # lib_bugsheet
//!
//! The reconciliation core behind `bugsheet`. Bugs are fetched from an issue
//! tracker, partitioned by owning team, and published as one immutable
//! snapshot that any number of readers can query while the next fetch is
//! already in flight.
//!
//! ## Layout (leaves first):
//! - **`configs`**: configuration errors and credential file loading.
//! - **`teams`**: the team directory mapping components to owning teams.
//! - **`bugs`**: records, the classifier, the per-team query engine, the
//!   snapshot store and the periodic reconciler.
//! - **`trackers`**: concrete `BugTracker` implementations (fixture files and,
//!   with the `retrieve` feature, the Bugzilla REST API).
//! - **`sheets`**: turning per-team counts into row updates for a tabular
//!   report, plus the Smartsheet destination (`retrieve` feature).
//! - **`retrieve`**: the retrying HTTP client (`retrieve` feature).

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

pub mod bugs;
pub mod configs;
pub mod sheets;
pub mod teams;
pub mod trackers;

#[cfg(feature = "retrieve")]
pub mod retrieve;

// --- Public API Re-exports ---
pub use bugs::{
    classify, AggregateStore, Bug, BugMap, BugQuery, BugTracker, FetchError, LoopState,
    ReconcileError, Reconciler, Snapshot,
};
pub use configs::ConfigError;
pub use sheets::{PublishSummary, Publisher, SheetDestination, SheetError};
pub use teams::{TeamDirectory, UNKNOWN_TEAM};
pub use trackers::{FixtureTracker, Tracker};
