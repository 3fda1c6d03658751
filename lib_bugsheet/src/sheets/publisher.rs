//! # Publisher
//!
//! Reads the current snapshot and writes its counts to the report sheet.
//! Planning is a pure function over a fetched [`Sheet`] and a [`BugMap`], so
//! it is tested without any destination at all.

use super::{
    Cell, Row, Sheet, SheetDestination, SheetError, ALL_BUGS_COLUMN, CURRENT_BUGS_COLUMN,
    TEAM_NAME_COLUMN,
};
use crate::bugs::{AggregateStore, BugMap, Snapshot};

/// Row updates derived from one sheet and one snapshot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PublishPlan {
    /// Updates for rows whose team is known.
    pub rows: Vec<Row>,
    /// Team names found in the sheet but absent from the map, in row order.
    pub unmatched: Vec<String>,
}

/// Outcome of one publish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishSummary {
    /// Generation of the snapshot that was published.
    pub generation: u64,
    /// Number of rows sent to the destination.
    pub rows_updated: usize,
    /// Team names in the sheet that had no counts.
    pub unmatched: Vec<String>,
}

/// Plans the row updates for `sheet` from `bug_map`.
///
/// Rows whose team-name cell is empty or not a string are ignored. Rows
/// naming a team the map does not know are skipped and reported in
/// [`PublishPlan::unmatched`].
///
/// # Errors
/// [`SheetError::MissingColumn`] when any of the three report columns is
/// missing.
pub fn plan_updates<S: AsRef<str>>(
    sheet: &Sheet,
    bug_map: &BugMap,
    targets: &[S],
) -> Result<PublishPlan, SheetError> {
    let column = |title: &str| {
        sheet
            .column_id(title)
            .ok_or_else(|| SheetError::MissingColumn(title.to_string()))
    };
    let team_column = column(TEAM_NAME_COLUMN)?;
    let all_column = column(ALL_BUGS_COLUMN)?;
    let current_column = column(CURRENT_BUGS_COLUMN)?;

    let mut plan = PublishPlan::default();
    for row in &sheet.rows {
        let Some(team) = row
            .cells
            .iter()
            .find(|c| c.column_id == team_column)
            .and_then(Cell::as_str)
        else {
            continue;
        };

        if !bug_map.contains_team(team) {
            log::warn!("Unable to find bugs for: {}", team);
            plan.unmatched.push(team.to_string());
            continue;
        }

        plan.rows.push(Row {
            id: row.id,
            cells: vec![
                Cell::count(current_column, bug_map.count_blocker(team, targets)),
                Cell::count(all_column, bug_map.count_all(team)),
            ],
        });
    }

    Ok(plan)
}

/// # Publisher
///
/// Publishes snapshots to one sheet of one destination.
#[derive(Debug)]
pub struct Publisher<D> {
    destination: D,
    sheet_id: String,
    targets: Vec<String>,
}

impl<D: SheetDestination> Publisher<D> {
    /// Publishes to `sheet_id`, counting blockers against `targets`.
    pub fn new(destination: D, sheet_id: impl Into<String>, targets: Vec<String>) -> Self {
        Self {
            destination,
            sheet_id: sheet_id.into(),
            targets,
        }
    }

    /// The underlying destination.
    pub fn destination(&self) -> &D {
        &self.destination
    }

    /// Publishes whatever snapshot is current in `store`.
    pub async fn publish(&self, store: &AggregateStore) -> Result<PublishSummary, SheetError> {
        let snapshot = store.read();
        self.publish_snapshot(&snapshot).await
    }

    /// Publishes `snapshot`. No update is sent when no row matched.
    pub async fn publish_snapshot(&self, snapshot: &Snapshot) -> Result<PublishSummary, SheetError> {
        let sheet = self.destination.fetch_sheet(&self.sheet_id).await?;
        let plan = plan_updates(&sheet, snapshot.bug_map(), self.targets.as_slice())?;

        if plan.rows.is_empty() {
            log::warn!("No rows in sheet {} matched a known team", self.sheet_id);
        } else {
            self.destination.update_rows(&self.sheet_id, &plan.rows).await?;
        }

        log::info!(
            "Published generation {} to sheet {}. Rows:{} Unmatched:{}",
            snapshot.generation(),
            self.sheet_id,
            plan.rows.len(),
            plan.unmatched.len()
        );

        Ok(PublishSummary {
            generation: snapshot.generation(),
            rows_updated: plan.rows.len(),
            unmatched: plan.unmatched,
        })
    }
}
