//! Google Sheets v4 record store.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use flexscan_core::{FlexscanError, NewRecord, RecordField, RecordRef, RecordStore};

use crate::layout;

pub const DEFAULT_API_BASE: &str = "https://sheets.googleapis.com/v4";

/// Connection settings for one worksheet.
#[derive(Debug, Clone)]
pub struct GoogleSheetsConfig {
    pub spreadsheet_id: String,
    pub tab: String,
    /// OAuth access token with the spreadsheets scope.
    pub access_token: String,
    pub api_base: String,
}

impl GoogleSheetsConfig {
    pub fn new(
        spreadsheet_id: impl Into<String>,
        tab: impl Into<String>,
        access_token: impl Into<String>,
    ) -> Self {
        Self {
            spreadsheet_id: spreadsheet_id.into(),
            tab: tab.into(),
            access_token: access_token.into(),
            api_base: DEFAULT_API_BASE.to_string(),
        }
    }
}

pub struct GoogleSheetsStore {
    client: Client,
    config: GoogleSheetsConfig,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AppendResponse {
    updates: Option<UpdatedCells>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdatedCells {
    updated_range: Option<String>,
}

#[derive(Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<String>>,
}

impl GoogleSheetsStore {
    pub fn new(config: GoogleSheetsConfig) -> Self {
        Self { client: Client::new(), config }
    }

    /// `{base}/spreadsheets/{id}/values/{range}` with the range URL-encoded.
    fn values_url(&self, range: &str) -> String {
        format!(
            "{}/spreadsheets/{}/values/{}",
            self.config.api_base.trim_end_matches('/'),
            self.config.spreadsheet_id,
            urlencoding::encode(range)
        )
    }

    /// Row of the last populated booking cell, read fresh from the sheet.
    async fn last_booking_row(&self) -> Result<u32, FlexscanError> {
        let range = layout::column_a1(&self.config.tab, RecordField::Booking);
        let response = self
            .client
            .get(self.values_url(&range))
            .bearer_auth(&self.config.access_token)
            .send()
            .await
            .map_err(|e| storage_error("read booking column", e))?;
        let response = check_status("read booking column", response).await?;
        let column: ValueRange = response
            .json()
            .await
            .map_err(|e| storage_error("parse booking column", e))?;

        // Rows are 1-based; the header row counts.
        let last = column
            .values
            .iter()
            .rposition(|row| row.first().is_some_and(|cell| !cell.is_empty()))
            .ok_or_else(|| FlexscanError::Storage("booking column is empty after append".into()))?;
        Ok(last as u32 + 1)
    }
}

fn storage_error(operation: &str, e: reqwest::Error) -> FlexscanError {
    FlexscanError::Storage(format!("{operation}: {e}"))
}

async fn check_status(
    operation: &str,
    response: reqwest::Response,
) -> Result<reqwest::Response, FlexscanError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(FlexscanError::Storage(format!("{operation}: {status}: {body}")))
}

#[async_trait]
impl RecordStore for GoogleSheetsStore {
    fn name(&self) -> &str {
        "google-sheets"
    }

    async fn create_record(&self, record: &NewRecord) -> Result<RecordRef, FlexscanError> {
        let range = layout::table_a1(&self.config.tab);
        let url = format!(
            "{}:append?valueInputOption=RAW&insertDataOption=INSERT_ROWS",
            self.values_url(&range)
        );
        let response = self
            .client
            .post(url)
            .bearer_auth(&self.config.access_token)
            .json(&json!({ "values": [layout::row_values(record)] }))
            .send()
            .await
            .map_err(|e| storage_error("append row", e))?;
        let response = check_status("append row", response).await?;
        let appended: AppendResponse = response
            .json()
            .await
            .map_err(|e| storage_error("parse append response", e))?;

        let reported = appended
            .updates
            .and_then(|u| u.updated_range)
            .and_then(|range| layout::row_of_range(&range));
        let row = match reported {
            Some(row) => row,
            None => {
                debug!("Append response carried no range, re-reading booking column");
                self.last_booking_row().await?
            }
        };

        info!(row, booking = %record.booking, "Record row created");
        Ok(RecordRef(row))
    }

    async fn update_field(
        &self,
        record: RecordRef,
        field: RecordField,
        value: &str,
    ) -> Result<(), FlexscanError> {
        let cell = layout::cell_a1(&self.config.tab, record.0, field);
        let response = self
            .client
            .put(format!("{}?valueInputOption=USER_ENTERED", self.values_url(&cell)))
            .bearer_auth(&self.config.access_token)
            .json(&json!({ "range": cell, "majorDimension": "ROWS", "values": [[value]] }))
            .send()
            .await
            .map_err(|e| storage_error("update cell", e))?;
        check_status("update cell", response).await?;

        debug!(row = record.0, field = %field, "Cell updated");
        Ok(())
    }
}
