//! Google Drive file listing and download.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info};

use super::{FileSource, RemoteError, TokenProvider};
use crate::models::RemoteFileRef;

const FILES_ENDPOINT: &str = "https://www.googleapis.com/drive/v3/files";
const PDF_MIME: &str = "application/pdf";
const DOCX_MIME: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
const PAGE_SIZE: &str = "1000";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListResponse {
    files: Option<Vec<ListEntry>>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListEntry {
    id: Option<String>,
    name: Option<String>,
    mime_type: Option<String>,
}

/// Drive-backed file source.
pub struct DriveClient {
    http: Client,
    tokens: Arc<dyn TokenProvider>,
}

impl DriveClient {
    pub fn new(http: Client, tokens: Arc<dyn TokenProvider>) -> Self {
        Self { http, tokens }
    }

    /// Build a browser-viewable link for a Drive file id.
    pub fn file_view_url(file_id: &str) -> String {
        format!("https://drive.google.com/file/d/{file_id}/view")
    }

    async fn fetch_page(
        &self,
        token: &str,
        query: &str,
        page_token: Option<&str>,
    ) -> Result<(Vec<RemoteFileRef>, Option<String>), RemoteError> {
        let mut request = self
            .http
            .get(FILES_ENDPOINT)
            .bearer_auth(token)
            .query(&[
                ("q", query),
                ("fields", "files(id,name,mimeType),nextPageToken"),
                ("pageSize", PAGE_SIZE),
            ]);

        if let Some(page_token) = page_token {
            request = request.query(&[("pageToken", page_token)]);
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(RemoteError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let payload: ListResponse = serde_json::from_str(&body)
            .map_err(|err| RemoteError::Malformed(format!("file list response: {err}")))?;

        let mut files = Vec::new();
        for entry in payload.files.unwrap_or_default() {
            // Entries missing any identifying field are unusable.
            let (Some(id), Some(name), Some(mime_type)) = (entry.id, entry.name, entry.mime_type)
            else {
                continue;
            };
            files.push(RemoteFileRef {
                id,
                name,
                mime_type,
            });
        }

        Ok((files, payload.next_page_token))
    }
}

#[async_trait]
impl FileSource for DriveClient {
    async fn list_folder(&self, folder_id: &str) -> Result<Vec<RemoteFileRef>, RemoteError> {
        let token = self.tokens.access_token().await?;
        let query = format!(
            "'{folder_id}' in parents and trashed=false \
             and (mimeType='{PDF_MIME}' or mimeType='{DOCX_MIME}')"
        );

        let mut files = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let (page, next_token) = self
                .fetch_page(&token, &query, page_token.as_deref())
                .await?;
            files.extend(page);

            match next_token {
                Some(next) => {
                    debug!("fetching next Drive listing page");
                    page_token = Some(next);
                }
                None => break,
            }
        }

        info!("found {} resume files in folder {}", files.len(), folder_id);
        Ok(files)
    }

    async fn download(&self, file_id: &str) -> Result<Vec<u8>, RemoteError> {
        let token = self.tokens.access_token().await?;
        let url = format!("{FILES_ENDPOINT}/{file_id}?alt=media");

        let response = self.http.get(url).bearer_auth(&token).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RemoteError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await?;
        Ok(bytes.to_vec())
    }
}
