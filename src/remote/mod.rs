//! Remote collaborators: file source, spreadsheet writer, token provider.
//!
//! The batch orchestrator only ever sees the traits defined here; the
//! Google-backed implementations live in the submodules. Tests substitute
//! in-memory fakes.

mod auth;
mod drive;
mod sheets;

pub use auth::StoredTokenProvider;
pub use drive::DriveClient;
pub use sheets::SheetsClient;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::RemoteFileRef;

/// Error types for remote API operations.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// The remote API answered with a non-success status.
    #[error("remote API returned status {status}: {body}")]
    Status { status: u16, body: String },
    /// The request never produced a status: timeout, connect failure,
    /// broken transfer.
    #[error("transport failure: {0}")]
    Transport(String),
    /// The API answered successfully but the body was not what we expect.
    #[error("unexpected response: {0}")]
    Malformed(String),
    /// No usable credentials.
    #[error("authentication required: {0}")]
    Auth(String),
}

impl RemoteError {
    /// Whether retrying the operation could plausibly succeed.
    ///
    /// Rate limits and server-side errors are retryable. Transport
    /// failures carry no status, so they are retried too rather than
    /// giving up on what may be a transient network blip.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            Self::Transport(_) => true,
            Self::Malformed(_) | Self::Auth(_) => false,
        }
    }
}

impl From<reqwest::Error> for RemoteError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

/// Lists and downloads resume documents from a remote folder.
#[async_trait]
pub trait FileSource: Send + Sync {
    /// List supported resume files in a folder, excluding trashed items.
    async fn list_folder(&self, folder_id: &str) -> Result<Vec<RemoteFileRef>, RemoteError>;

    /// Download a file's bytes.
    async fn download(&self, file_id: &str) -> Result<Vec<u8>, RemoteError>;
}

/// Creates spreadsheets and appends result rows to them.
#[async_trait]
pub trait SheetWriter: Send + Sync {
    /// Create a spreadsheet and return its identifier.
    async fn create_spreadsheet(&self, title: &str) -> Result<String, RemoteError>;

    /// Append rows below any existing data.
    ///
    /// When the target sheet is empty, rows are written from the first
    /// cell as-is. Otherwise rows are appended, dropping the leading row
    /// when `rows_include_header` so headers are never duplicated. Rows
    /// whose cells are all blank are not sent.
    async fn append_rows(
        &self,
        spreadsheet_id: &str,
        rows: &[Vec<String>],
        rows_include_header: bool,
    ) -> Result<(), RemoteError>;
}

/// Supplies API access tokens, caching and storage included.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// A currently-usable access token.
    async fn access_token(&self) -> Result<String, RemoteError>;

    /// Drop any locally cached credentials.
    async fn clear(&self) -> Result<(), RemoteError>;
}
