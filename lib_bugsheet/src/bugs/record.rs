//! # Bug Records
//!
//! `Bug` mirrors the fields requested from the tracker. Only the first entry
//! of `component` and `target_release` is significant: the first component
//! decides ownership and the first target release decides which release a
//! bug counts against.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Severity value excluded from blocker counts.
pub const LOW_SEVERITY: &str = "low";

/// # Bug
///
/// A single tracker entry. Immutable once fetched; shared between the raw
/// sequence and the team map of a snapshot through `Arc`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bug {
    /// Tracker identifier.
    pub id: u64,
    /// One-line summary.
    #[serde(default)]
    pub summary: String,
    /// Workflow status, e.g. "NEW" or "ASSIGNED".
    #[serde(default)]
    pub status: String,
    /// Severity, e.g. "urgent", "high", "medium", "low".
    #[serde(default)]
    pub severity: String,
    /// Target releases; the first entry is significant.
    #[serde(default)]
    pub target_release: Vec<String>,
    /// Components; the first entry is the classification key.
    #[serde(default)]
    pub component: Vec<String>,
    /// Keywords attached to the bug.
    #[serde(default)]
    pub keywords: BTreeSet<String>,
}

impl Bug {
    /// The classification key, if the bug lists any component.
    pub fn first_component(&self) -> Option<&str> {
        self.component.first().map(String::as_str)
    }

    /// The significant target release, if any.
    pub fn first_target_release(&self) -> Option<&str> {
        self.target_release.first().map(String::as_str)
    }

    /// Exact, case-sensitive keyword membership.
    pub fn has_keyword(&self, keyword: &str) -> bool {
        self.keywords.contains(keyword)
    }

    /// True when the severity is exactly [`LOW_SEVERITY`].
    pub fn is_low_severity(&self) -> bool {
        self.severity == LOW_SEVERITY
    }
}

/// One negatable `field op value` clause of a tracker search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdvancedQuery {
    /// Field name, e.g. "component".
    pub field: String,
    /// Operator, e.g. "equals".
    pub op: String,
    /// Operand.
    pub value: String,
    /// Invert the clause.
    #[serde(default)]
    pub negate: bool,
}

/// # Bug Query
///
/// Search parameters handed to the tracker untouched. The core never
/// interprets these; it only passes them to [`BugTracker::search`].
///
/// [`BugTracker::search`]: super::tracker::BugTracker::search
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BugQuery {
    /// Classifications to search.
    #[serde(default)]
    pub classification: Vec<String>,
    /// Products to search.
    #[serde(default)]
    pub product: Vec<String>,
    /// Statuses to include.
    #[serde(default)]
    pub status: Vec<String>,
    /// Fields the tracker should return.
    #[serde(default)]
    pub include_fields: Vec<String>,
    /// Additional clauses.
    #[serde(default)]
    pub advanced: Vec<AdvancedQuery>,
}

impl BugQuery {
    /// All open OpenShift bugs outside the Documentation component.
    pub fn all_open_bugs() -> Self {
        let strings = |items: &[&str]| -> Vec<String> { items.iter().map(|s| s.to_string()).collect() };
        Self {
            classification: strings(&["Red Hat"]),
            product: strings(&["OpenShift Container Platform"]),
            status: strings(&["NEW", "ASSIGNED", "POST", "ON_DEV", "MODIFIED"]),
            include_fields: strings(&[
                "id",
                "summary",
                "status",
                "severity",
                "target_release",
                "component",
                "sub_components",
                "keywords",
            ]),
            advanced: vec![AdvancedQuery {
                field: "component".to_string(),
                op: "equals".to_string(),
                value: "Documentation".to_string(),
                negate: true,
            }],
        }
    }
}

impl Default for BugQuery {
    fn default() -> Self {
        Self::all_open_bugs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_tracker_payload() {
        let raw = serde_json::json!({
            "id": 1812345,
            "summary": "router pods crashloop",
            "status": "ASSIGNED",
            "severity": "high",
            "target_release": ["4.5.0"],
            "component": ["Routing", "Networking"],
            "keywords": ["UpcomingSprint", "Regression"],
            "sub_components": ["ignored"]
        });

        let bug: Bug = serde_json::from_value(raw).unwrap();
        assert_eq!(bug.id, 1812345);
        assert_eq!(bug.first_component(), Some("Routing"));
        assert_eq!(bug.first_target_release(), Some("4.5.0"));
        assert!(bug.has_keyword("UpcomingSprint"));
        assert!(!bug.has_keyword("upcomingsprint"));
        assert!(!bug.is_low_severity());
    }

    #[test]
    fn test_missing_lists_default_to_empty() {
        let bug: Bug = serde_json::from_value(serde_json::json!({"id": 7})).unwrap();
        assert_eq!(bug.first_component(), None);
        assert_eq!(bug.first_target_release(), None);
        assert!(bug.keywords.is_empty());
    }

    #[test]
    fn test_default_query_excludes_documentation() {
        let query = BugQuery::default();
        assert_eq!(query.status.len(), 5);
        assert_eq!(query.advanced.len(), 1);
        assert_eq!(query.advanced[0].value, "Documentation");
        assert!(query.advanced[0].negate);
    }

    #[test]
    fn test_query_partial_override_from_json() {
        let query: BugQuery = serde_json::from_value(serde_json::json!({
            "product": ["OKD"],
            "status": ["NEW"]
        }))
        .unwrap();
        assert_eq!(query.product, vec!["OKD"]);
        assert!(query.advanced.is_empty());
    }
}
