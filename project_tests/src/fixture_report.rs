//! # Fixture Report
//!
//! Runs one reconciliation against a bug fixture file and prints the per-team
//! counts the sync service would publish.
//!
//! Usage: `fixture_report <teams.json> <bugs.json> [target ...]`

use anyhow::{Context, Result};
use lib_bugsheet::{BugQuery, FixtureTracker, Reconciler, TeamDirectory};
use std::path::PathBuf;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    let mut args = std::env::args().skip(1);
    let teams = PathBuf::from(args.next().context("missing team directory path")?);
    let bugs = PathBuf::from(args.next().context("missing bug fixture path")?);
    let mut targets: Vec<String> = args.collect();
    if targets.is_empty() {
        targets = vec!["---".to_string(), "4.5.0".to_string()];
    }

    let directory = Arc::new(TeamDirectory::load(&teams)?);
    let reconciler =
        Reconciler::bootstrap(FixtureTracker::new(bugs), BugQuery::default(), directory).await?;
    let snapshot = reconciler.store().read();
    let map = snapshot.bug_map();

    println!("--- {} bugs, targets {:?} ---", snapshot.bugs().len(), targets);
    println!("{:<24} {:>6} {:>8} {:>6} {:>8}", "team", "all", "blocker", "low", "sprint");
    for team in map.teams() {
        println!(
            "{:<24} {:>6} {:>8} {:>6} {:>8}",
            team,
            map.count_all(team),
            map.count_blocker(team, targets.as_slice()),
            map.count_low_severity(team),
            map.count_upcoming_sprint(team)
        );
    }

    Ok(())
}
