//! # Tracker Implementations
//!
//! Concrete [`BugTracker`]s and the runtime switch between them.
//!
//! - **`fixture`**: bugs read from a JSON file on every search.
//! - **`bugzilla`**: the Bugzilla REST API (`retrieve` feature).

/// File-backed tracker for tests and demos.
pub mod fixture;

/// Live Bugzilla tracker.
#[cfg(feature = "retrieve")]
pub mod bugzilla;

#[cfg(feature = "retrieve")]
pub use bugzilla::{query_pairs, BugzillaClient};
pub use fixture::FixtureTracker;

use crate::bugs::{Bug, BugQuery, BugTracker, FetchError};
use crate::configs::ConfigError;
use std::path::Path;

/// # Tracker
///
/// The tracker chosen at startup. A configured fixture file always wins over
/// the live tracker.
#[derive(Debug, Clone)]
pub enum Tracker {
    /// Bugs served from a fixture file.
    Fixture(FixtureTracker),
    /// Bugs served by Bugzilla.
    #[cfg(feature = "retrieve")]
    Bugzilla(BugzillaClient),
}

impl Tracker {
    /// Picks the fixture tracker when `fixture` is set, otherwise Bugzilla at
    /// `endpoint` with the key stored in `key_path`.
    ///
    /// # Errors
    /// Fails when the key file cannot be read or the endpoint is invalid.
    /// Without the `retrieve` feature a fixture path is mandatory.
    pub fn select(
        fixture: Option<&Path>,
        endpoint: &str,
        key_path: &Path,
    ) -> Result<Self, ConfigError> {
        if let Some(path) = fixture {
            log::info!("Using fixture bug data from {}", path.display());
            return Ok(Tracker::Fixture(FixtureTracker::new(path)));
        }

        #[cfg(feature = "retrieve")]
        {
            let api_key = crate::configs::read_api_key(key_path)?;
            log::info!("Using Bugzilla at {}", endpoint);
            Ok(Tracker::Bugzilla(BugzillaClient::new(endpoint, api_key)?))
        }

        #[cfg(not(feature = "retrieve"))]
        {
            let _ = (endpoint, key_path);
            Err(ConfigError::MissingSetting("test_bug_data".to_string()))
        }
    }
}

impl BugTracker for Tracker {
    async fn search(&self, query: &BugQuery) -> Result<Vec<Bug>, FetchError> {
        match self {
            Tracker::Fixture(t) => t.search(query).await,
            #[cfg(feature = "retrieve")]
            Tracker::Bugzilla(t) => t.search(query).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_fixture_wins_over_live_tracker() {
        let tracker = Tracker::select(
            Some(Path::new("bugs.json")),
            "https://bugzilla.example.com/",
            Path::new("/no/such/key"),
        )
        .unwrap();
        assert!(matches!(tracker, Tracker::Fixture(f) if f.path() == Path::new("bugs.json")));
    }

    #[cfg(feature = "retrieve")]
    #[test]
    fn test_live_tracker_needs_a_key_file() {
        let result = Tracker::select(None, "https://bugzilla.example.com/", Path::new("/no/such/key"));
        assert!(matches!(result, Err(ConfigError::Io { .. })));

        let mut key = NamedTempFile::new().unwrap();
        writeln!(key, "abc123").unwrap();
        let tracker = Tracker::select(None, "https://bugzilla.example.com/", key.path()).unwrap();
        assert!(matches!(tracker, Tracker::Bugzilla(_)));
    }

    #[tokio::test]
    async fn test_dispatches_to_fixture() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(br#"[{"id": 5}]"#).unwrap();

        let tracker = Tracker::select(Some(file.path()), "", Path::new("")).unwrap();
        let bugs = tracker.search(&BugQuery::default()).await.unwrap();
        assert_eq!(bugs[0].id, 5);
    }
}
