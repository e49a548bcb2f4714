//! Configuration management for cvharvest.
//!
//! Settings are a plain struct loaded once at startup and passed to the
//! components that need them. They persist as JSON in the data directory
//! so the `config` CLI command can adjust them between runs.

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

/// Tunables consumed by the parsing pipeline and the batch orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// Maximum files processed concurrently within one job.
    #[serde(default = "default_max_concurrent_files")]
    pub max_concurrent_files: usize,
    /// Files per spreadsheet append batch.
    #[serde(default = "default_sheet_batch_size")]
    pub sheet_batch_size: usize,
    /// Attempts per file before giving up on retryable failures.
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,
    /// Base delay for exponential backoff between attempts.
    #[serde(default = "default_retry_delay_seconds")]
    pub retry_delay_seconds: f64,
    /// Hours a finished job's records are kept on disk.
    #[serde(default = "default_job_retention_hours")]
    pub job_retention_hours: i64,
    /// Tesseract executable, resolved through PATH when not absolute.
    #[serde(default = "default_tesseract_path")]
    pub tesseract_path: String,
    /// Seconds before an OCR subprocess is abandoned.
    #[serde(default = "default_ocr_timeout_seconds")]
    pub ocr_timeout_seconds: u64,
}

impl Settings {
    /// Clamp every field to its usable range.
    pub fn sanitized(mut self) -> Self {
        self.max_concurrent_files = self.max_concurrent_files.max(1);
        self.sheet_batch_size = self.sheet_batch_size.max(1);
        self.max_retries = self.max_retries.max(1);
        self.retry_delay_seconds = self.retry_delay_seconds.max(0.1);
        self.job_retention_hours = self.job_retention_hours.max(1);
        self.ocr_timeout_seconds = self.ocr_timeout_seconds.max(1);
        if self.tesseract_path.trim().is_empty() {
            self.tesseract_path = default_tesseract_path();
        }
        self
    }

    /// Load settings from the data directory, falling back to defaults
    /// when the file is absent.
    pub fn load(data_dir: &Path) -> anyhow::Result<Self> {
        let path = settings_path(data_dir);
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let settings: Settings = serde_json::from_str(&raw)
            .with_context(|| format!("invalid settings file {}", path.display()))?;
        Ok(settings.sanitized())
    }

    /// Persist settings to the data directory.
    pub fn save(&self, data_dir: &Path) -> anyhow::Result<()> {
        std::fs::create_dir_all(data_dir)
            .with_context(|| format!("failed to create {}", data_dir.display()))?;
        let path = settings_path(data_dir);
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, json)
            .with_context(|| format!("failed to write {}", path.display()))?;
        Ok(())
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            max_concurrent_files: default_max_concurrent_files(),
            sheet_batch_size: default_sheet_batch_size(),
            max_retries: default_max_retries(),
            retry_delay_seconds: default_retry_delay_seconds(),
            job_retention_hours: default_job_retention_hours(),
            tesseract_path: default_tesseract_path(),
            ocr_timeout_seconds: default_ocr_timeout_seconds(),
        }
    }
}

/// Resolve the data directory, preferring an explicit override.
///
/// Defaults to the platform data dir (e.g. `~/.local/share/cvharvest`),
/// falling back to `./cvharvest-data` when no home is available.
pub fn resolve_data_dir(override_dir: Option<PathBuf>) -> PathBuf {
    if let Some(dir) = override_dir {
        return dir;
    }
    if let Ok(env_dir) = std::env::var("CVHARVEST_DATA_DIR") {
        if !env_dir.trim().is_empty() {
            return PathBuf::from(env_dir);
        }
    }
    dirs::data_dir()
        .map(|d| d.join("cvharvest"))
        .unwrap_or_else(|| PathBuf::from("cvharvest-data"))
}

fn settings_path(data_dir: &Path) -> PathBuf {
    data_dir.join("settings.json")
}

fn default_max_concurrent_files() -> usize {
    10
}

fn default_sheet_batch_size() -> usize {
    100
}

fn default_max_retries() -> usize {
    3
}

fn default_retry_delay_seconds() -> f64 {
    1.0
}

fn default_job_retention_hours() -> i64 {
    24
}

fn default_tesseract_path() -> String {
    "tesseract".to_string()
}

fn default_ocr_timeout_seconds() -> u64 {
    120
}
