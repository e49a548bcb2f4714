//! Stored-token credential provider.
//!
//! The interactive OAuth dance happens outside this tool; `cvh auth
//! login --token` persists a token obtained elsewhere, and this provider
//! serves it from an in-memory cache backed by a file in the data
//! directory.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use super::{RemoteError, TokenProvider};

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredToken {
    access_token: String,
}

/// Token provider reading from `<data_dir>/token.json`.
pub struct StoredTokenProvider {
    path: PathBuf,
    cached: RwLock<Option<String>>,
}

impl StoredTokenProvider {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            path: data_dir.join("token.json"),
            cached: RwLock::new(None),
        }
    }

    /// Persist a token for later runs.
    pub async fn store(&self, access_token: &str) -> Result<(), RemoteError> {
        let trimmed = access_token.trim();
        if trimmed.is_empty() {
            return Err(RemoteError::Auth("refusing to store an empty token".to_string()));
        }

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|err| RemoteError::Auth(format!("cannot create token dir: {err}")))?;
        }

        let record = StoredToken {
            access_token: trimmed.to_string(),
        };
        let json = serde_json::to_string_pretty(&record)
            .map_err(|err| RemoteError::Auth(err.to_string()))?;
        tokio::fs::write(&self.path, json)
            .await
            .map_err(|err| RemoteError::Auth(format!("cannot write token file: {err}")))?;

        let mut cached = self.cached.write().await;
        *cached = Some(trimmed.to_string());
        Ok(())
    }

    /// Whether a token is currently stored.
    pub async fn is_signed_in(&self) -> bool {
        self.access_token().await.is_ok()
    }
}

#[async_trait]
impl TokenProvider for StoredTokenProvider {
    async fn access_token(&self) -> Result<String, RemoteError> {
        {
            let cached = self.cached.read().await;
            if let Some(token) = cached.as_ref() {
                return Ok(token.clone());
            }
        }

        let raw = tokio::fs::read_to_string(&self.path).await.map_err(|_| {
            RemoteError::Auth("no stored token; run `cvh auth login` first".to_string())
        })?;
        let record: StoredToken = serde_json::from_str(&raw)
            .map_err(|err| RemoteError::Auth(format!("corrupt token file: {err}")))?;

        let mut cached = self.cached.write().await;
        *cached = Some(record.access_token.clone());
        Ok(record.access_token)
    }

    async fn clear(&self) -> Result<(), RemoteError> {
        {
            let mut cached = self.cached.write().await;
            *cached = None;
        }
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(RemoteError::Auth(format!("cannot remove token file: {err}"))),
        }
    }
}
