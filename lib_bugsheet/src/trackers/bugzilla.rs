//! # Bugzilla Tracker
//!
//! Runs a [`BugQuery`] against the Bugzilla REST search endpoint
//! (`GET rest/bug`). Authentication is a Bearer API key.
//!
//! ## Query mapping:
//! - `classification`, `product`, `bug_status`: one parameter per value.
//! - `include_fields`: a single comma-separated parameter.
//! - advanced clauses: numbered `fN`, `oN`, `vN`, plus `nN=1` when negated,
//!   starting at `N = 1`.

use crate::bugs::{Bug, BugQuery, BugTracker, FetchError};
use crate::configs::ConfigError;
use crate::retrieve::{ApiClient, RetrieveError};
use serde::Deserialize;

/// Public Red Hat Bugzilla.
pub const DEFAULT_ENDPOINT: &str = "https://bugzilla.redhat.com/";

const SEARCH_PATH: &str = "rest/bug";

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    bugs: Vec<Bug>,
}

/// Live [`BugTracker`] backed by a Bugzilla instance.
#[derive(Debug, Clone)]
pub struct BugzillaClient {
    api: ApiClient,
}

impl BugzillaClient {
    /// Creates a client for `endpoint` authenticating with `api_key`.
    ///
    /// # Errors
    /// Returns [`ConfigError::InvalidEndpoint`] when `endpoint` is not an
    /// absolute URL.
    pub fn new(endpoint: &str, api_key: String) -> Result<Self, ConfigError> {
        let api = ApiClient::new(endpoint, Some(api_key)).map_err(|e| {
            ConfigError::InvalidEndpoint {
                endpoint: endpoint.to_string(),
                message: e.to_string(),
            }
        })?;
        Ok(Self { api })
    }
}

/// Encodes `query` as Bugzilla search parameters, in a stable order.
pub fn query_pairs(query: &BugQuery) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    let mut push_all = |key: &str, values: &[String]| {
        for value in values {
            pairs.push((key.to_string(), value.clone()));
        }
    };

    push_all("classification", &query.classification);
    push_all("product", &query.product);
    push_all("bug_status", &query.status);

    if !query.include_fields.is_empty() {
        pairs.push(("include_fields".to_string(), query.include_fields.join(",")));
    }

    for (idx, clause) in query.advanced.iter().enumerate() {
        let n = idx + 1;
        pairs.push((format!("f{}", n), clause.field.clone()));
        pairs.push((format!("o{}", n), clause.op.clone()));
        pairs.push((format!("v{}", n), clause.value.clone()));
        if clause.negate {
            pairs.push((format!("n{}", n), "1".to_string()));
        }
    }

    pairs
}

fn to_fetch_error(err: RetrieveError) -> FetchError {
    match err {
        RetrieveError::Decode(message) => FetchError::Decode(message),
        other => FetchError::Transport(other.to_string()),
    }
}

impl BugTracker for BugzillaClient {
    async fn search(&self, query: &BugQuery) -> Result<Vec<Bug>, FetchError> {
        let resp = self
            .api
            .get::<SearchResponse>(SEARCH_PATH, &query_pairs(query))
            .await
            .map_err(to_fetch_error)?;

        if !resp.success {
            return Err(FetchError::Status {
                status: resp.status,
                body: resp.error_body.unwrap_or_default(),
            });
        }

        let bugs = resp
            .data
            .map(|r| r.bugs)
            .ok_or_else(|| FetchError::Decode("empty search response".to_string()))?;
        log::debug!("Bugzilla search returned {} bugs", bugs.len());
        Ok(bugs)
    }
}
