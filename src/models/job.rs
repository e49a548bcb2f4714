//! Batch job models: requests, remote file references, and durable
//! job status records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Request to process every resume in a remote folder.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchRequest {
    /// Remote folder to enumerate. Must be non-empty.
    pub folder_id: String,
    /// Existing spreadsheet to append to. A new one is created when absent.
    pub spreadsheet_id: Option<String>,
}

/// A file as reported by the remote listing, before download.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteFileRef {
    pub id: String,
    pub name: String,
    pub mime_type: String,
}

/// Lifecycle state of a batch job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Pending,
    Processing,
    Completed,
    Failed,
    Revoked,
}

impl JobState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Revoked => "revoked",
        }
    }

    /// Whether the job has reached a state it will never leave.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Revoked)
    }
}

/// Durable status record for one batch job.
///
/// Exactly one record exists per job id; the worker processing the job
/// is its only writer (last write wins).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStatus {
    pub job_id: String,
    pub state: JobState,
    /// 0-100. Capped at 99 until the job reaches a terminal state.
    pub progress: i32,
    pub total_files: i32,
    pub processed_files: i32,
    pub spreadsheet_id: Option<String>,
    pub results_count: Option<i32>,
    pub error: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub duration_seconds: Option<f64>,
}

impl JobStatus {
    /// A freshly enqueued job, before the worker has picked it up.
    pub fn pending(job_id: String, spreadsheet_id: Option<String>) -> Self {
        Self {
            job_id,
            state: JobState::Pending,
            progress: 0,
            total_files: 0,
            processed_files: 0,
            spreadsheet_id,
            results_count: None,
            error: None,
            created_at: Some(Utc::now()),
            started_at: None,
            completed_at: None,
            duration_seconds: None,
        }
    }
}

/// Derive a progress percentage from file counts.
///
/// Stays below 100 so only the terminal status write can report completion.
pub fn progress_percent(processed: i32, total: i32) -> i32 {
    if total <= 0 {
        return 0;
    }
    (((processed as f64) * 100.0 / total as f64).floor() as i32).min(99)
}
