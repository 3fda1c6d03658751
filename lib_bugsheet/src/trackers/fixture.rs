//! # Fixture Tracker
//!
//! Serves bugs from a JSON file instead of a live tracker. The file is re-read
//! on every search, so rewriting it between cycles changes what the next
//! reconciliation sees.
//!
//! Accepted shapes: the tracker's own `{ "bugs": [...] }` envelope, or a bare
//! array of bugs.

use crate::bugs::{Bug, BugQuery, BugTracker, FetchError};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Deserialize)]
#[serde(untagged)]
enum FixturePayload {
    Wrapped { bugs: Vec<Bug> },
    Bare(Vec<Bug>),
}

/// File-backed [`BugTracker`]. The query is ignored.
#[derive(Debug, Clone)]
pub struct FixtureTracker {
    path: PathBuf,
}

impl FixtureTracker {
    /// Serves the bugs stored at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The fixture file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn fixture_error(&self, message: impl ToString) -> FetchError {
        FetchError::Fixture {
            path: self.path.clone(),
            message: message.to_string(),
        }
    }
}

impl BugTracker for FixtureTracker {
    async fn search(&self, _query: &BugQuery) -> Result<Vec<Bug>, FetchError> {
        let raw = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| self.fixture_error(e))?;

        let bugs = match serde_json::from_str::<FixturePayload>(&raw)
            .map_err(|e| self.fixture_error(e))?
        {
            FixturePayload::Wrapped { bugs } => bugs,
            FixturePayload::Bare(bugs) => bugs,
        };

        log::debug!("Loaded {} bugs from fixture {}", bugs.len(), self.path.display());
        Ok(bugs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn fixture(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[tokio::test]
    async fn test_reads_wrapped_payload() {
        let file = fixture(r#"{"bugs": [{"id": 1, "component": ["Etcd"]}, {"id": 2}]}"#);
        let tracker = FixtureTracker::new(file.path());

        let bugs = tracker.search(&BugQuery::default()).await.unwrap();
        assert_eq!(bugs.iter().map(|b| b.id).collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(bugs[0].first_component(), Some("Etcd"));
    }

    #[tokio::test]
    async fn test_reads_bare_array() {
        let file = fixture(r#"[{"id": 3, "severity": "low"}]"#);
        let bugs = FixtureTracker::new(file.path())
            .search(&BugQuery::default())
            .await
            .unwrap();
        assert_eq!(bugs.len(), 1);
        assert!(bugs[0].is_low_severity());
    }

    #[tokio::test]
    async fn test_rereads_file_on_each_search() {
        let file = fixture(r#"[{"id": 1}]"#);
        let tracker = FixtureTracker::new(file.path());
        assert_eq!(tracker.search(&BugQuery::default()).await.unwrap().len(), 1);

        std::fs::write(file.path(), r#"[{"id": 1}, {"id": 2}, {"id": 3}]"#).unwrap();
        assert_eq!(tracker.search(&BugQuery::default()).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_missing_and_malformed_files_fail() {
        let tracker = FixtureTracker::new("/definitely/not/here.json");
        assert!(matches!(
            tracker.search(&BugQuery::default()).await,
            Err(FetchError::Fixture { .. })
        ));

        let file = fixture(r#"{"bugs": "nope"}"#);
        let err = FixtureTracker::new(file.path())
            .search(&BugQuery::default())
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Fixture { path, .. } if path == file.path()));
    }
}
