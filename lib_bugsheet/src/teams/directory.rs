//! # Team Directory
//!
//! Maps component names to the team that owns them. The mapping is built once
//! from an [`OrgData`] document and never mutated afterwards, so lookups are
//! plain `HashMap` reads with no synchronization.
//!
//! Components that no team claims resolve to the [`UNKNOWN_TEAM`] sentinel.
//! When two teams claim the same component, the team listed first in the
//! document keeps it and a warning is logged.

use crate::configs::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

/// Sentinel team collecting bugs whose component matches no known team.
pub const UNKNOWN_TEAM: &str = "unknown";

/// # Team Info
///
/// One team entry in the org document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamInfo {
    /// Unique team name. Used as the row key in published reports.
    #[serde(default)]
    pub name: String,
    /// Team lead.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub lead: String,
    /// Managers responsible for the team.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub managers: Vec<String>,
    /// Larger organizational group the team belongs to.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub group: String,
    /// Tracker components owned by this team.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub components: Vec<String>,
}

/// Key dates of a release.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Milestones {
    /// Development start.
    #[serde(default)]
    pub start: String,
    /// Feature complete.
    #[serde(default)]
    pub feature_complete: String,
    /// Code freeze.
    #[serde(default)]
    pub code_freeze: String,
    /// General availability.
    #[serde(default)]
    pub ga: String,
}

/// A release and the tracker target values that count towards it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseInfo {
    /// Release name, e.g. "4.5".
    #[serde(default)]
    pub name: String,
    /// `target_release` values considered part of this release.
    #[serde(default)]
    pub targets: Vec<String>,
    /// Release milestones.
    #[serde(default)]
    pub milestones: Milestones,
}

/// # Org Data
///
/// The on-disk team directory document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrgData {
    /// Display title of the organization.
    #[serde(rename = "OrgTitle", default)]
    pub org_title: String,
    /// All teams, in document order.
    #[serde(rename = "Teams", default)]
    pub teams: Vec<TeamInfo>,
    /// Known releases.
    #[serde(rename = "Releases", default)]
    pub releases: Vec<ReleaseInfo>,
}

/// # Team Directory
///
/// Immutable component → team index over an [`OrgData`] document.
#[derive(Debug, Clone)]
pub struct TeamDirectory {
    org: OrgData,
    /// Component name → index into `org.teams`.
    owners: HashMap<String, usize>,
}

impl TeamDirectory {
    /// Builds the directory, validating team names and indexing components.
    ///
    /// # Errors
    /// Returns [`ConfigError::InvalidDirectory`] when a team has an empty
    /// name, a name appears twice, or a team is named [`UNKNOWN_TEAM`].
    pub fn new(org: OrgData) -> Result<Self, ConfigError> {
        let mut seen = HashSet::new();
        let mut owners = HashMap::new();

        for (idx, team) in org.teams.iter().enumerate() {
            if team.name.is_empty() {
                return Err(ConfigError::InvalidDirectory(format!(
                    "team at position {} has no name",
                    idx
                )));
            }
            if team.name == UNKNOWN_TEAM {
                return Err(ConfigError::InvalidDirectory(format!(
                    "team name '{}' is reserved",
                    UNKNOWN_TEAM
                )));
            }
            if !seen.insert(team.name.clone()) {
                return Err(ConfigError::InvalidDirectory(format!(
                    "duplicate team name '{}'",
                    team.name
                )));
            }

            for component in &team.components {
                match owners.get(component) {
                    Some(&first) => {
                        let first: &TeamInfo = &org.teams[first];
                        log::warn!(
                            "Component '{}' is claimed by both '{}' and '{}'; keeping '{}'",
                            component,
                            first.name,
                            team.name,
                            first.name
                        );
                    }
                    None => {
                        owners.insert(component.clone(), idx);
                    }
                }
            }
        }

        Ok(Self { org, owners })
    }

    /// Loads the directory from a JSON file, or JSON5 when the extension is `.json5`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let is_json5 = path
            .extension()
            .map_or(false, |ext| ext.eq_ignore_ascii_case("json5"));

        let org: OrgData = if is_json5 {
            json5::from_str(&raw).map_err(|e| ConfigError::Parse {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?
        } else {
            serde_json::from_str(&raw).map_err(|e| ConfigError::Parse {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?
        };

        let directory = Self::new(org)?;
        log::info!(
            "Loaded team directory '{}' from {}: {} teams, {} components",
            directory.org.org_title,
            path.display(),
            directory.org.teams.len(),
            directory.owners.len()
        );
        Ok(directory)
    }

    /// Returns the owning team for `component`, or [`UNKNOWN_TEAM`].
    pub fn resolve_team(&self, component: &str) -> &str {
        self.owners
            .get(component)
            .map(|&idx| self.org.teams[idx].name.as_str())
            .unwrap_or(UNKNOWN_TEAM)
    }

    /// Team names in document order. Does not include [`UNKNOWN_TEAM`].
    pub fn team_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.org.teams.iter().map(|t| t.name.as_str())
    }

    /// Looks up a team by name.
    pub fn team(&self, name: &str) -> Option<&TeamInfo> {
        self.org.teams.iter().find(|t| t.name == name)
    }

    /// Number of teams in the directory.
    pub fn len(&self) -> usize {
        self.org.teams.len()
    }

    /// True when the directory defines no teams.
    pub fn is_empty(&self) -> bool {
        self.org.teams.is_empty()
    }

    /// Organization title.
    pub fn org_title(&self) -> &str {
        &self.org.org_title
    }

    /// Known releases.
    pub fn releases(&self) -> &[ReleaseInfo] {
        &self.org.releases
    }

    /// Target values for the named release.
    pub fn targets_for(&self, release: &str) -> Option<&[String]> {
        self.org
            .releases
            .iter()
            .find(|r| r.name == release)
            .map(|r| r.targets.as_slice())
    }
}
