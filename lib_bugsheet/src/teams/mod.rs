//! # Team Directory Module
//!
//! Organizational data loaded once at startup: which teams exist, who leads
//! them, and which components each one owns. The directory is read-only for
//! the lifetime of the process and is shared between the reconciler and any
//! reporting code through an `Arc`.

/// Org data models and the component → team lookup.
pub mod directory;

pub use directory::{Milestones, OrgData, ReleaseInfo, TeamDirectory, TeamInfo, UNKNOWN_TEAM};
