//! Google Sheets spreadsheet creation and row appends.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use super::{RemoteError, SheetWriter, TokenProvider};

const SHEETS_ENDPOINT: &str = "https://sheets.googleapis.com/v4/spreadsheets";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateResponse {
    spreadsheet_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProbeResponse {
    values: Option<Vec<Vec<String>>>,
}

/// Sheets-backed row writer.
pub struct SheetsClient {
    http: Client,
    tokens: Arc<dyn TokenProvider>,
}

impl SheetsClient {
    pub fn new(http: Client, tokens: Arc<dyn TokenProvider>) -> Self {
        Self { http, tokens }
    }

    /// Whether the first row of the sheet already holds data.
    async fn has_data(&self, token: &str, spreadsheet_id: &str) -> bool {
        let probe_url = format!("{SHEETS_ENDPOINT}/{spreadsheet_id}/values/A1:Z1");
        let response = match self.http.get(&probe_url).bearer_auth(token).send().await {
            Ok(response) => response,
            Err(_) => return false,
        };

        if !response.status().is_success() {
            return false;
        }

        let body = response.text().await.unwrap_or_default();
        serde_json::from_str::<ProbeResponse>(&body)
            .ok()
            .and_then(|p| p.values)
            .map(|v| !v.is_empty() && !v[0].is_empty())
            .unwrap_or(false)
    }
}

#[async_trait]
impl SheetWriter for SheetsClient {
    async fn create_spreadsheet(&self, title: &str) -> Result<String, RemoteError> {
        let token = self.tokens.access_token().await?;
        let payload = json!({
            "properties": { "title": title },
            "sheets": [
                { "properties": { "title": "Resume Data" } }
            ]
        });

        let response = self
            .http
            .post(SHEETS_ENDPOINT)
            .bearer_auth(&token)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(RemoteError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let created: CreateResponse = serde_json::from_str(&body)
            .map_err(|err| RemoteError::Malformed(format!("create response: {err}")))?;
        created
            .spreadsheet_id
            .ok_or_else(|| RemoteError::Malformed("response missing spreadsheetId".to_string()))
    }

    // The empty-sheet probe followed by a write is racy if another writer
    // targets the same spreadsheet; a single writer per spreadsheet is
    // assumed.
    async fn append_rows(
        &self,
        spreadsheet_id: &str,
        rows: &[Vec<String>],
        rows_include_header: bool,
    ) -> Result<(), RemoteError> {
        if rows.is_empty() {
            return Ok(());
        }

        let token = self.tokens.access_token().await?;

        if !self.has_data(&token, spreadsheet_id).await {
            let put_url = format!(
                "{SHEETS_ENDPOINT}/{spreadsheet_id}/values/A1?valueInputOption=USER_ENTERED"
            );
            let response = self
                .http
                .put(&put_url)
                .bearer_auth(&token)
                .json(&json!({ "values": rows }))
                .send()
                .await?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(RemoteError::Status {
                    status: status.as_u16(),
                    body,
                });
            }

            return Ok(());
        }

        let rows_to_append: Vec<&Vec<String>> = rows
            .iter()
            .skip(if rows_include_header { 1 } else { 0 })
            .filter(|row| row.iter().any(|cell| !cell.trim().is_empty()))
            .collect();

        if rows_to_append.is_empty() {
            return Ok(());
        }

        let append_url = format!(
            "{SHEETS_ENDPOINT}/{spreadsheet_id}/values/A1:append\
             ?valueInputOption=USER_ENTERED&insertDataOption=INSERT_ROWS"
        );
        let response = self
            .http
            .post(&append_url)
            .bearer_auth(&token)
            .json(&json!({ "values": rows_to_append }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RemoteError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(())
    }
}
