//! Durable job state on disk.
//!
//! Each job owns a directory under the jobs root holding two JSON
//! artifacts, `status.json` and `results.json`. A single async mutex
//! serializes every mutating and listing operation; the store is meant
//! for one process, not for concurrent writers across processes.

use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{Duration, Utc};
use tokio::sync::Mutex;
use tracing::info;

use crate::models::{Candidate, JobStatus};

/// JSON-file-backed store of job statuses and result sets.
pub struct JobStore {
    jobs_root: PathBuf,
    retention_hours: i64,
    lock: Mutex<()>,
}

impl JobStore {
    /// Create a store rooted at `<data_dir>/jobs`.
    pub fn new(data_dir: &Path, retention_hours: i64) -> Self {
        Self::with_root(data_dir.join("jobs"), retention_hours)
    }

    /// Create a store with an explicit jobs root.
    pub fn with_root(jobs_root: PathBuf, retention_hours: i64) -> Self {
        Self {
            jobs_root,
            retention_hours: retention_hours.max(1),
            lock: Mutex::new(()),
        }
    }

    pub fn jobs_root(&self) -> &Path {
        &self.jobs_root
    }

    /// Upsert the status record for a job.
    pub async fn save_status(&self, status: &JobStatus) -> anyhow::Result<()> {
        let _guard = self.lock.lock().await;
        let path = self.status_path(&status.job_id);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let json = serde_json::to_string_pretty(status)?;
        tokio::fs::write(path, json).await?;
        Ok(())
    }

    /// Load a job's status, or `None` for unknown job ids.
    pub async fn load_status(&self, job_id: &str) -> anyhow::Result<Option<JobStatus>> {
        let _guard = self.lock.lock().await;
        let path = self.status_path(job_id);
        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Ok(None);
        }

        let json = tokio::fs::read_to_string(path).await?;
        Ok(Some(serde_json::from_str(&json)?))
    }

    /// Upsert the full result list for a job.
    pub async fn save_results(&self, job_id: &str, results: &[Candidate]) -> anyhow::Result<()> {
        let _guard = self.lock.lock().await;
        let path = self.results_path(job_id);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let json = serde_json::to_string_pretty(results)?;
        tokio::fs::write(path, json).await?;
        Ok(())
    }

    /// Load a job's results, or `None` when none were persisted.
    pub async fn load_results(&self, job_id: &str) -> anyhow::Result<Option<Vec<Candidate>>> {
        let _guard = self.lock.lock().await;
        let path = self.results_path(job_id);
        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Ok(None);
        }

        let json = tokio::fs::read_to_string(path).await?;
        Ok(Some(serde_json::from_str(&json)?))
    }

    /// List known job ids, newest first, after a retention sweep.
    pub async fn list_jobs(&self) -> anyhow::Result<Vec<String>> {
        self.cleanup_expired_jobs().await?;

        if !tokio::fs::try_exists(&self.jobs_root)
            .await
            .unwrap_or(false)
        {
            return Ok(Vec::new());
        }

        let mut dir = tokio::fs::read_dir(&self.jobs_root).await?;
        let mut ids = Vec::new();
        while let Some(entry) = dir.next_entry().await? {
            if !entry.metadata().await?.is_dir() {
                continue;
            }

            let name = entry.file_name().to_string_lossy().to_string();
            if !name.trim().is_empty() {
                ids.push(name);
            }
        }

        ids.sort_by(|a, b| b.cmp(a));
        Ok(ids)
    }

    /// Delete jobs older than the retention window.
    ///
    /// The reference time is the job's completion time when it has one,
    /// else its creation time, else now (which keeps jobs with unreadable
    /// status around rather than deleting them on a parse hiccup).
    pub async fn cleanup_expired_jobs(&self) -> anyhow::Result<()> {
        if !tokio::fs::try_exists(&self.jobs_root)
            .await
            .unwrap_or(false)
        {
            return Ok(());
        }

        let _guard = self.lock.lock().await;
        let now = Utc::now();
        let mut dir = tokio::fs::read_dir(&self.jobs_root).await?;

        while let Some(entry) = dir.next_entry().await? {
            if !entry.metadata().await?.is_dir() {
                continue;
            }

            let job_id = entry.file_name().to_string_lossy().to_string();
            if job_id.trim().is_empty() {
                continue;
            }

            let status_path = self.status_path(&job_id);
            let reference_time = if tokio::fs::try_exists(&status_path).await.unwrap_or(false) {
                let json = tokio::fs::read_to_string(&status_path)
                    .await
                    .with_context(|| format!("failed reading {}", status_path.display()))?;
                match serde_json::from_str::<JobStatus>(&json) {
                    Ok(status) => status.completed_at.or(status.created_at).unwrap_or(now),
                    Err(_) => now,
                }
            } else {
                now
            };

            if now.signed_duration_since(reference_time) > Duration::hours(self.retention_hours) {
                info!("removing expired job {job_id}");
                tokio::fs::remove_dir_all(entry.path()).await?;
            }
        }

        Ok(())
    }

    fn status_path(&self, job_id: &str) -> PathBuf {
        self.jobs_root.join(job_id).join("status.json")
    }

    fn results_path(&self, job_id: &str) -> PathBuf {
        self.jobs_root.join(job_id).join("results.json")
    }
}
