//! # Smartsheet Destination
//!
//! `GET sheets/{id}` to read columns and rows, `PUT sheets/{id}/rows` to apply
//! partial row updates. Authentication is a Bearer access token.

use super::{Row, Sheet, SheetDestination, SheetError};
use crate::configs::ConfigError;
use crate::retrieve::{ApiClient, ApiResponse, RetrieveError};

/// Smartsheet API 2.0.
pub const DEFAULT_ENDPOINT: &str = "https://api.smartsheet.com/2.0/";

/// [`SheetDestination`] backed by the Smartsheet REST API.
#[derive(Debug, Clone)]
pub struct SmartsheetClient {
    api: ApiClient,
}

impl SmartsheetClient {
    /// Creates a client for `endpoint` authenticating with `token`.
    ///
    /// # Errors
    /// Returns [`ConfigError::InvalidEndpoint`] when `endpoint` is not an
    /// absolute URL.
    pub fn new(endpoint: &str, token: String) -> Result<Self, ConfigError> {
        let api = ApiClient::new(endpoint, Some(token)).map_err(|e| {
            ConfigError::InvalidEndpoint {
                endpoint: endpoint.to_string(),
                message: e.to_string(),
            }
        })?;
        Ok(Self { api })
    }
}

fn to_sheet_error(err: RetrieveError) -> SheetError {
    match err {
        RetrieveError::Decode(message) => SheetError::Decode(message),
        other => SheetError::Transport(other.to_string()),
    }
}

fn require_success<T>(resp: ApiResponse<T>) -> Result<Option<T>, SheetError> {
    if resp.success {
        Ok(resp.data)
    } else {
        Err(SheetError::Status {
            status: resp.status,
            body: resp.error_body.unwrap_or_default(),
        })
    }
}

impl SheetDestination for SmartsheetClient {
    async fn fetch_sheet(&self, sheet_id: &str) -> Result<Sheet, SheetError> {
        let resp = self
            .api
            .get::<Sheet>(&format!("sheets/{}", sheet_id), &[])
            .await
            .map_err(to_sheet_error)?;

        require_success(resp)?.ok_or_else(|| SheetError::Decode("empty sheet response".to_string()))
    }

    async fn update_rows(&self, sheet_id: &str, rows: &[Row]) -> Result<(), SheetError> {
        let resp = self
            .api
            .put::<serde_json::Value, _>(&format!("sheets/{}/rows", sheet_id), rows)
            .await
            .map_err(to_sheet_error)?;

        require_success(resp)?;
        log::debug!("Updated {} rows on sheet {}", rows.len(), sheet_id);
        Ok(())
    }
}
