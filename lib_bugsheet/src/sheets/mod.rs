//! # Sheet Publishing Module
//!
//! Turns per-team counts from the current snapshot into row updates on a
//! tabular report.
//!
//! ## Components:
//! - **`SheetDestination`**: where sheets are read from and rows written to.
//! - **`publisher`**: matches sheet rows to teams and plans the updates.
//! - **`smartsheet`**: the Smartsheet REST destination (`retrieve` feature).
//!
//! A row is keyed by the string in its `Team Name` cell. Each matched row
//! receives the team's blocker count for the configured target releases and
//! its total open bug count.

/// Row matching and update planning.
pub mod publisher;

/// Smartsheet REST destination.
#[cfg(feature = "retrieve")]
pub mod smartsheet;

pub use publisher::{plan_updates, PublishPlan, PublishSummary, Publisher};
#[cfg(feature = "retrieve")]
pub use smartsheet::SmartsheetClient;

use serde::{Deserialize, Serialize};
use std::future::Future;
use thiserror::Error;

/// Column holding the team name that keys each row.
pub const TEAM_NAME_COLUMN: &str = "Team Name";
/// Column receiving the total open bug count.
pub const ALL_BUGS_COLUMN: &str = "Bug Count (All)";
/// Column receiving the blocker count for the target releases.
pub const CURRENT_BUGS_COLUMN: &str = "Bug Count (Current Release)";

/// Failures while reading or updating a sheet.
#[derive(Debug, Error)]
pub enum SheetError {
    /// The request never produced a response.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The sheet service answered with a non-success status.
    #[error("Sheet service returned HTTP {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, if it could be read.
        body: String,
    },

    /// The response did not have the expected shape.
    #[error("Failed to decode sheet response: {0}")]
    Decode(String),

    /// The sheet lacks one of the required columns.
    #[error("Sheet has no column titled '{0}'")]
    MissingColumn(String),
}

/// A sheet column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    /// Column id.
    pub id: u64,
    /// Column title as displayed.
    #[serde(default)]
    pub title: String,
}

/// One cell of a row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cell {
    /// Column this cell belongs to.
    pub column_id: u64,
    /// Cell value; absent for empty cells.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,
}

impl Cell {
    /// A cell holding an integer.
    pub fn count(column_id: u64, value: usize) -> Self {
        Self {
            column_id,
            value: Some(serde_json::Value::from(value)),
        }
    }

    /// The value, when it is a string.
    pub fn as_str(&self) -> Option<&str> {
        self.value.as_ref().and_then(serde_json::Value::as_str)
    }
}

/// A sheet row. Also the shape of a row update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    /// Row id.
    pub id: u64,
    /// Cells in the row; an update only lists the cells it changes.
    #[serde(default)]
    pub cells: Vec<Cell>,
}

/// A sheet with its columns and rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sheet {
    /// Sheet id.
    pub id: u64,
    /// Sheet name.
    #[serde(default)]
    pub name: String,
    /// Columns in display order.
    #[serde(default)]
    pub columns: Vec<Column>,
    /// Rows in display order.
    #[serde(default)]
    pub rows: Vec<Row>,
}

impl Sheet {
    /// Id of the column titled `title`.
    pub fn column_id(&self, title: &str) -> Option<u64> {
        self.columns.iter().find(|c| c.title == title).map(|c| c.id)
    }
}

/// # Sheet Destination
///
/// Where reports are published.
pub trait SheetDestination: Send + Sync {
    /// Reads the sheet's columns and rows.
    fn fetch_sheet(&self, sheet_id: &str) -> impl Future<Output = Result<Sheet, SheetError>> + Send;

    /// Applies `rows` as partial row updates.
    fn update_rows(
        &self,
        sheet_id: &str,
        rows: &[Row],
    ) -> impl Future<Output = Result<(), SheetError>> + Send;
}
