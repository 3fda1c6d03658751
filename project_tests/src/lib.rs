//! # Shared Test Fixtures
//!
//! Helpers for the end-to-end reconciliation tests: an on-disk team directory,
//! bug fixture files that can be rewritten between cycles, and a way to wait
//! for the reconciler to publish a given generation.

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

use lib_bugsheet::AggregateStore;
use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Writes a three-team directory to `dir/teams.json` and returns its path.
///
/// Networking owns `Networking` and `Routing`, Storage owns `Storage`, Etcd
/// owns `Etcd`.
pub fn write_team_directory(dir: &Path) -> PathBuf {
    let path = dir.join("teams.json");
    let org = json!({
        "OrgTitle": "OpenShift Platform",
        "Teams": [
            {"name": "Networking", "lead": "alice", "components": ["Networking", "Routing"]},
            {"name": "Storage", "lead": "bob", "components": ["Storage"]},
            {"name": "Etcd", "lead": "carol", "components": ["Etcd"]}
        ],
        "Releases": [
            {"name": "4.5", "targets": ["---", "4.5.0"]}
        ]
    });
    fs::write(&path, org.to_string()).expect("write team directory");
    path
}

/// A tracker-shaped bug record.
pub fn bug(id: u64, component: &str, severity: &str, target: &str, keywords: &[&str]) -> Value {
    json!({
        "id": id,
        "summary": format!("bug {}", id),
        "status": "NEW",
        "severity": severity,
        "component": [component],
        "target_release": [target],
        "keywords": keywords,
    })
}

/// Replaces the fixture at `path` with `bugs`, in the tracker's envelope.
pub fn write_bugs(path: &Path, bugs: &[Value]) {
    let payload = json!({ "bugs": bugs });
    fs::write(path, payload.to_string()).expect("write bug fixture");
}

/// Waits until `store` reaches `generation`, panicking after five seconds.
pub async fn wait_for_generation(store: &AggregateStore, generation: u64) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while store.generation() < generation {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("store never reached the expected generation");
}
