//! # Tracker Capability
//!
//! The only way the reconciler talks to an issue tracker. Implementations
//! live in `crate::trackers`; tests substitute their own.

use super::record::{Bug, BugQuery};
use std::future::Future;
use std::path::PathBuf;
use thiserror::Error;

/// Failures of a single tracker search. Every variant is terminal for the
/// reconciliation loop.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The request never produced a response (DNS, TLS, connection reset).
    #[error("Transport error: {0}")]
    Transport(String),

    /// The tracker answered with a non-success status.
    #[error("Tracker returned HTTP {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, if it could be read.
        body: String,
    },

    /// The response body did not match the expected shape.
    #[error("Failed to decode tracker response: {0}")]
    Decode(String),

    /// A fixture file could not be read or parsed.
    #[error("Failed to load fixture {path}: {message}")]
    Fixture {
        /// The fixture file.
        path: PathBuf,
        /// What went wrong.
        message: String,
    },
}

/// # Bug Tracker
///
/// Runs a search and returns every matching bug in tracker order.
///
/// The returned future must be `Send` so the reconciler can run on a spawned
/// tokio task.
pub trait BugTracker: Send + Sync {
    /// Executes `query` against the tracker.
    fn search(&self, query: &BugQuery) -> impl Future<Output = Result<Vec<Bug>, FetchError>> + Send;
}
