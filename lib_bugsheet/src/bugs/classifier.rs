//! # Classifier
//!
//! Partitions one fetch into a [`BugMap`]. Stateless and single-pass: the
//! map depends only on the fetched bugs and the team directory.

use super::bugmap::BugMap;
use super::record::Bug;
use crate::teams::{TeamDirectory, UNKNOWN_TEAM};
use std::sync::Arc;

/// Partitions `bugs` by owning team.
///
/// Every directory team gets an entry, even when empty, plus [`UNKNOWN_TEAM`].
/// Each bug lands in exactly one team, chosen by its first component, and
/// fetch order is preserved within a team. Bugs without any component are
/// routed to [`UNKNOWN_TEAM`].
pub fn classify(bugs: &[Arc<Bug>], directory: &TeamDirectory) -> BugMap {
    let mut map = BugMap::with_teams(directory.team_names().chain([UNKNOWN_TEAM]));

    for bug in bugs {
        let team = match bug.first_component() {
            Some(component) => directory.resolve_team(component),
            None => {
                log::debug!("Bug {} has no component; routing to '{}'", bug.id, UNKNOWN_TEAM);
                UNKNOWN_TEAM
            }
        };
        map.push(team, Arc::clone(bug));
    }

    map
}
