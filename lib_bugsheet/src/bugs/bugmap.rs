//! # Per-Team Query Engine
//!
//! `BugMap` is the classification map of a snapshot: team name → bugs owned
//! by that team, in fetch order. Every method is total. Asking about a team
//! the map does not know yields `0` or an empty slice, never an error.
//!
//! Filters build new maps. The bugs themselves are shared through `Arc` and
//! are never mutated, so a filtered map can be held and queried while the
//! snapshot it came from is replaced.

use super::record::Bug;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

/// Keyword marking bugs planned for the next sprint.
pub const UPCOMING_SPRINT: &str = "UpcomingSprint";

/// # Bug Map
///
/// Team name → ordered bugs. Teams are kept sorted by name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BugMap {
    teams: BTreeMap<String, Vec<Arc<Bug>>>,
}

impl BugMap {
    /// An empty map with no teams.
    pub fn new() -> Self {
        Self::default()
    }

    /// A map with an empty entry for each of `names`.
    pub fn with_teams<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            teams: names.into_iter().map(|n| (n.into(), Vec::new())).collect(),
        }
    }

    /// Appends `bug` to `team`, creating the entry if needed.
    pub(crate) fn push(&mut self, team: &str, bug: Arc<Bug>) {
        match self.teams.get_mut(team) {
            Some(bugs) => bugs.push(bug),
            None => {
                self.teams.insert(team.to_string(), vec![bug]);
            }
        }
    }

    /// Sorted team names.
    pub fn teams(&self) -> impl Iterator<Item = &str> + '_ {
        self.teams.keys().map(String::as_str)
    }

    /// True when `team` has an entry, even an empty one.
    pub fn contains_team(&self, team: &str) -> bool {
        self.teams.contains_key(team)
    }

    /// Bugs owned by `team`; empty when the team is unknown.
    pub fn get(&self, team: &str) -> &[Arc<Bug>] {
        self.teams.get(team).map(Vec::as_slice).unwrap_or(&[])
    }

    /// `(team, bugs)` pairs in team order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Arc<Bug>])> + '_ {
        self.teams.iter().map(|(t, b)| (t.as_str(), b.as_slice()))
    }

    /// Number of team entries.
    pub fn len(&self) -> usize {
        self.teams.len()
    }

    /// True when the map has no team entries.
    pub fn is_empty(&self) -> bool {
        self.teams.is_empty()
    }

    /// Total bugs across all teams.
    pub fn total_bugs(&self) -> usize {
        self.teams.values().map(Vec::len).sum()
    }

    fn filter_with<F>(&self, keep: F) -> BugMap
    where
        F: Fn(&Bug) -> bool,
    {
        let teams = self
            .teams
            .iter()
            .map(|(team, bugs)| {
                let kept = bugs.iter().filter(|b| keep(b)).cloned().collect();
                (team.clone(), kept)
            })
            .collect();
        BugMap { teams }
    }

    fn count_with<F>(&self, team: &str, keep: F) -> usize
    where
        F: Fn(&Bug) -> bool,
    {
        self.get(team).iter().filter(|b| keep(b)).count()
    }

    /// Keeps, per team, the bugs whose first target release is in `releases`.
    ///
    /// Matching is exact. Bugs without a target release never match, so an
    /// empty `releases` yields an empty sequence for every team.
    pub fn filter_by_target_release<I, S>(&self, releases: I) -> BugMap
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let releases = to_set(releases);
        self.filter_with(|bug| {
            bug.first_target_release()
                .map_or(false, |target| releases.contains(target))
        })
    }

    /// Keeps, per team, the bugs whose severity is exactly one of `severities`.
    pub fn filter_by_severity<I, S>(&self, severities: I) -> BugMap
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let severities = to_set(severities);
        self.filter_with(|bug| severities.contains(bug.severity.as_str()))
    }

    /// Number of bugs owned by `team`.
    pub fn count_all(&self, team: &str) -> usize {
        self.get(team).len()
    }

    /// Bugs in `team` carrying `keyword`.
    pub fn count_by_keyword(&self, team: &str, keyword: &str) -> usize {
        self.count_with(team, |bug| bug.has_keyword(keyword))
    }

    /// Bugs in `team` planned for the upcoming sprint.
    pub fn count_upcoming_sprint(&self, team: &str) -> usize {
        self.count_by_keyword(team, UPCOMING_SPRINT)
    }

    /// Bugs in `team` not planned for the upcoming sprint.
    pub fn count_not_upcoming_sprint(&self, team: &str) -> usize {
        self.count_all(team) - self.count_upcoming_sprint(team)
    }

    /// Low-severity bugs in `team`.
    pub fn count_low_severity(&self, team: &str) -> usize {
        self.count_with(team, Bug::is_low_severity)
    }

    /// Bugs in `team` whose severity is anything but low.
    pub fn count_not_low_severity(&self, team: &str) -> usize {
        self.count_all(team) - self.count_low_severity(team)
    }

    /// Bugs in `team` whose first target release is in `targets`.
    pub fn count_target_release<S: AsRef<str>>(&self, team: &str, targets: &[S]) -> usize {
        self.count_with(team, |bug| targeted(bug, targets))
    }

    /// # Blocker Count
    ///
    /// Bugs in `team` that are not low severity AND whose first target
    /// release is in `targets`. This is the figure published per team.
    pub fn count_blocker<S: AsRef<str>>(&self, team: &str, targets: &[S]) -> usize {
        self.count_with(team, |bug| !bug.is_low_severity() && targeted(bug, targets))
    }
}

fn to_set<I, S>(items: I) -> HashSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    items.into_iter().map(|s| s.as_ref().to_string()).collect()
}

fn targeted<S: AsRef<str>>(bug: &Bug, targets: &[S]) -> bool {
    match bug.first_target_release() {
        Some(release) => targets.iter().any(|t| t.as_ref() == release),
        None => false,
    }
}
