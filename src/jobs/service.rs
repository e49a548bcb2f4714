//! Batch job orchestration.
//!
//! `BatchService` owns the job queue and the single background worker
//! that drains it. Jobs run strictly one at a time in enqueue order;
//! within a job, files are processed concurrently behind a per-job
//! admission semaphore, with retry and exponential backoff around each
//! download. Spreadsheet rows and progress updates go out after every
//! batch, so an operator watching the job sees it advance long before
//! it finishes.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, Mutex, Semaphore};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::{JobError, JobStore};
use crate::config::Settings;
use crate::models::{
    progress_percent, BatchRequest, Candidate, JobState, JobStatus, RemoteFileRef,
};
use crate::parser::ResumeParser;
use crate::remote::{DriveClient, FileSource, RemoteError, SheetWriter, TokenProvider};
use crate::utils::ensure_extension;

/// Column order for spreadsheet output.
const HEADER_COLUMNS: [&str; 6] = [
    "Name",
    "Resume Link",
    "Phone Number",
    "Email ID",
    "LinkedIn",
    "GitHub",
];

/// The unit handed to the worker: a job id plus its request.
struct WorkItem {
    job_id: String,
    request: BatchRequest,
}

/// Mutable state accumulated while one job runs.
struct JobRun {
    job_id: String,
    spreadsheet_id: Option<String>,
    results: Vec<Candidate>,
    processed_files: i32,
    total_files: i32,
    created_at: Option<DateTime<Utc>>,
    started_at: DateTime<Utc>,
}

impl JobRun {
    fn processing_status(&self) -> JobStatus {
        JobStatus {
            job_id: self.job_id.clone(),
            state: JobState::Processing,
            progress: progress_percent(self.processed_files, self.total_files),
            total_files: self.total_files,
            processed_files: self.processed_files,
            spreadsheet_id: self.spreadsheet_id.clone(),
            results_count: if self.results.is_empty() {
                None
            } else {
                Some(self.results.len() as i32)
            },
            error: None,
            created_at: self.created_at,
            started_at: Some(self.started_at),
            completed_at: None,
            duration_seconds: None,
        }
    }

    fn terminal_status(
        &self,
        state: JobState,
        error: Option<String>,
        completed_at: DateTime<Utc>,
    ) -> JobStatus {
        let progress = if state == JobState::Completed {
            100
        } else {
            progress_percent(self.processed_files, self.total_files)
        };
        JobStatus {
            job_id: self.job_id.clone(),
            state,
            progress,
            total_files: self.total_files,
            processed_files: self.processed_files,
            spreadsheet_id: self.spreadsheet_id.clone(),
            results_count: Some(self.results.len() as i32),
            error,
            created_at: self.created_at,
            started_at: Some(self.started_at),
            completed_at: Some(completed_at),
            duration_seconds: Some(
                (completed_at - self.started_at).num_milliseconds() as f64 / 1000.0,
            ),
        }
    }
}

/// Accepts batch requests and processes them on a background worker.
pub struct BatchService {
    settings: Settings,
    parser: ResumeParser,
    files: Arc<dyn FileSource>,
    sheets: Arc<dyn SheetWriter>,
    tokens: Arc<dyn TokenProvider>,
    store: Arc<JobStore>,
    queue_tx: mpsc::UnboundedSender<WorkItem>,
    cancel_tokens: Mutex<HashMap<String, CancellationToken>>,
    shutdown: CancellationToken,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl BatchService {
    /// Build the service and spawn its worker task.
    pub fn new(
        settings: Settings,
        store: Arc<JobStore>,
        files: Arc<dyn FileSource>,
        sheets: Arc<dyn SheetWriter>,
        tokens: Arc<dyn TokenProvider>,
        parser: ResumeParser,
    ) -> Arc<Self> {
        let (queue_tx, queue_rx) = mpsc::unbounded_channel();

        let service = Arc::new(Self {
            settings,
            parser,
            files,
            sheets,
            tokens,
            store,
            queue_tx,
            cancel_tokens: Mutex::new(HashMap::new()),
            shutdown: CancellationToken::new(),
            worker: Mutex::new(None),
        });

        let worker_service = Arc::clone(&service);
        let handle = tokio::spawn(async move {
            worker_service.run_worker(queue_rx).await;
        });
        // The worker handle goes into a mutex so shutdown() can await it.
        if let Ok(mut slot) = service.worker.try_lock() {
            *slot = Some(handle);
        }

        service
    }

    /// Parse one document without touching the queue or the store.
    pub async fn parse_single(&self, file_name: String, data: Vec<u8>) -> Candidate {
        let extraction = self.parser.parse_bytes(&file_name, &data).await;
        Candidate::from_extraction(extraction, None, Some(file_name))
    }

    /// Validate and enqueue a batch job, returning its id.
    ///
    /// The job is persisted as `Pending` before this returns, so a
    /// status poll never races the enqueue.
    pub async fn start_batch_job(&self, request: BatchRequest) -> anyhow::Result<String> {
        if request.folder_id.trim().is_empty() {
            return Err(JobError::InvalidRequest("folderId is required".to_string()).into());
        }
        if self.shutdown.is_cancelled() {
            return Err(JobError::InvalidRequest("service is shutting down".to_string()).into());
        }

        // Fail fast when no credentials are stored, rather than letting
        // the job die asynchronously on its first remote call.
        self.tokens.access_token().await?;

        self.store.cleanup_expired_jobs().await?;

        let job_id = Uuid::new_v4().to_string();
        let pending = JobStatus::pending(job_id.clone(), request.spreadsheet_id.clone());
        self.store.save_status(&pending).await?;

        self.queue_tx
            .send(WorkItem {
                job_id: job_id.clone(),
                request,
            })
            .map_err(|_| anyhow::anyhow!("worker queue is closed"))?;

        info!("enqueued batch job {job_id}");
        Ok(job_id)
    }

    /// Look up a job's status.
    pub async fn job_status(&self, job_id: &str) -> anyhow::Result<JobStatus> {
        self.store
            .load_status(job_id)
            .await?
            .ok_or_else(|| JobError::NotFound(job_id.to_string()).into())
    }

    /// Fetch a completed job's results.
    ///
    /// Unknown jobs are an error, as are jobs that have not completed.
    /// A completed job with no stored results (the zero-file case)
    /// yields an empty list.
    pub async fn job_results(&self, job_id: &str) -> anyhow::Result<Vec<Candidate>> {
        if let Some(results) = self.store.load_results(job_id).await? {
            return Ok(results);
        }

        let status = self
            .store
            .load_status(job_id)
            .await?
            .ok_or_else(|| JobError::NotFound(job_id.to_string()))?;

        if status.state != JobState::Completed {
            return Err(JobError::NotCompleted(job_id.to_string()).into());
        }

        Ok(Vec::new())
    }

    /// List known job ids, newest first.
    pub async fn list_jobs(&self) -> anyhow::Result<Vec<String>> {
        self.store.list_jobs().await
    }

    /// Request cancellation of a running job.
    ///
    /// Returns whether a running job was found to signal. Cancellation
    /// is cooperative: the worker notices between batches and between
    /// retry attempts, then lands the job in `Revoked`.
    pub async fn cancel_job(&self, job_id: &str) -> bool {
        let token = {
            let tokens = self.cancel_tokens.lock().await;
            tokens.get(job_id).cloned()
        };

        match token {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Stop accepting jobs and wait for the worker to drain.
    pub async fn shutdown(&self) {
        self.shutdown.cancel();
        let handle = {
            let mut slot = self.worker.lock().await;
            slot.take()
        };
        if let Some(handle) = handle {
            if let Err(err) = handle.await {
                if !err.is_cancelled() {
                    warn!("worker task ended abnormally: {err}");
                }
            }
        }
    }

    async fn run_worker(self: Arc<Self>, mut queue_rx: mpsc::UnboundedReceiver<WorkItem>) {
        loop {
            let item = tokio::select! {
                _ = self.shutdown.cancelled() => break,
                item = queue_rx.recv() => match item {
                    Some(item) => item,
                    None => break,
                },
            };

            // A job failure never takes the worker down with it.
            if let Err(err) = self.process_job(item).await {
                error!("batch worker error: {err:#}");
            }
        }
        info!("batch worker stopped");
    }

    async fn process_job(&self, item: WorkItem) -> anyhow::Result<()> {
        info!("processing batch job {}", item.job_id);
        let started_at = Utc::now();

        let created_at = self
            .store
            .load_status(&item.job_id)
            .await?
            .and_then(|s| s.created_at)
            .or(Some(started_at));

        let cancel = CancellationToken::new();
        {
            let mut tokens = self.cancel_tokens.lock().await;
            tokens.insert(item.job_id.clone(), cancel.clone());
        }

        let mut run = JobRun {
            job_id: item.job_id.clone(),
            spreadsheet_id: item.request.spreadsheet_id.clone(),
            results: Vec::new(),
            processed_files: 0,
            total_files: 0,
            created_at,
            started_at,
        };

        let outcome = self.run_pipeline(&mut run, &item.request, &cancel).await;

        {
            let mut tokens = self.cancel_tokens.lock().await;
            tokens.remove(&item.job_id);
        }

        let completed_at = Utc::now();
        match outcome {
            Ok(()) => {
                self.store.save_results(&run.job_id, &run.results).await?;
                self.store
                    .save_status(&run.terminal_status(JobState::Completed, None, completed_at))
                    .await?;
                info!(
                    "job {} completed: {}/{} files",
                    run.job_id, run.processed_files, run.total_files
                );
            }
            Err(err) => {
                let state = if cancel.is_cancelled() {
                    JobState::Revoked
                } else {
                    JobState::Failed
                };
                warn!("job {} ended {}: {err:#}", run.job_id, state.as_str());
                self.store
                    .save_status(&run.terminal_status(
                        state,
                        Some(err.to_string()),
                        completed_at,
                    ))
                    .await?;
            }
        }

        Ok(())
    }

    async fn run_pipeline(
        &self,
        run: &mut JobRun,
        request: &BatchRequest,
        cancel: &CancellationToken,
    ) -> anyhow::Result<()> {
        self.store.save_status(&run.processing_status()).await?;

        let files = self.files.list_folder(&request.folder_id).await?;
        if files.is_empty() {
            self.store.save_results(&run.job_id, &[]).await?;
            return Ok(());
        }

        run.total_files = files.len() as i32;

        if run.spreadsheet_id.as_deref().unwrap_or_default().is_empty() {
            let title = format!(
                "Resume Parse Results - {}",
                Utc::now().format("%Y-%m-%d %H:%M:%S")
            );
            let sheet_id = self.sheets.create_spreadsheet(&title).await?;
            let header: Vec<Vec<String>> = vec![HEADER_COLUMNS
                .iter()
                .map(|c| c.to_string())
                .collect()];
            self.sheets.append_rows(&sheet_id, &header, true).await?;
            run.spreadsheet_id = Some(sheet_id);
        }

        self.store.save_status(&run.processing_status()).await?;

        // One admission gate for the whole job; every file future takes
        // a permit before doing work.
        let gate = Arc::new(Semaphore::new(self.settings.max_concurrent_files.max(1)));

        for batch in files.chunks(self.settings.sheet_batch_size.max(1)) {
            if cancel.is_cancelled() {
                anyhow::bail!("job canceled");
            }

            let batch_futures = batch
                .iter()
                .map(|file| self.process_file_with_retry(file.clone(), Arc::clone(&gate), cancel));
            let batch_results: Vec<Candidate> = futures::future::join_all(batch_futures).await;

            let rows: Vec<Vec<String>> = batch_results
                .iter()
                .map(candidate_row)
                .filter(|row| row.iter().any(|cell| !cell.trim().is_empty()))
                .collect();

            if !rows.is_empty() {
                if let Some(sheet_id) = run.spreadsheet_id.as_deref() {
                    self.sheets.append_rows(sheet_id, &rows, false).await?;
                }
                run.processed_files += rows.len() as i32;
            }

            run.results.extend(batch_results);
            self.store.save_status(&run.processing_status()).await?;
        }

        if cancel.is_cancelled() {
            anyhow::bail!("job canceled");
        }

        Ok(())
    }

    /// Process one file, retrying retryable download failures with
    /// exponential backoff. Always yields a candidate; failures degrade
    /// to a zero-confidence record with the errors attached.
    async fn process_file_with_retry(
        &self,
        file: RemoteFileRef,
        gate: Arc<Semaphore>,
        cancel: &CancellationToken,
    ) -> Candidate {
        let _permit = match gate.acquire().await {
            Ok(permit) => permit,
            Err(_) => {
                return Candidate::empty(
                    Some(file.name),
                    None,
                    vec!["admission gate closed".to_string()],
                )
            }
        };

        if file.id.trim().is_empty() {
            return Candidate::empty(
                Some(file.name),
                None,
                vec!["Missing file ID".to_string()],
            );
        }

        let mut errors = Vec::new();

        for attempt in 0..self.settings.max_retries {
            match self.process_file_once(&file).await {
                Ok(candidate) => return candidate,
                Err(err) => {
                    let last_attempt = attempt + 1 >= self.settings.max_retries;
                    if err.is_retryable() && !last_attempt && !cancel.is_cancelled() {
                        let backoff =
                            self.settings.retry_delay_seconds * 2_f64.powf(attempt as f64);
                        tokio::time::sleep(Duration::from_secs_f64(backoff.max(0.1))).await;
                        continue;
                    }

                    errors.push(format!("Error processing file: {err}"));
                    break;
                }
            }
        }

        Candidate::empty(Some(file.name), Some(file.id), errors)
    }

    async fn process_file_once(&self, file: &RemoteFileRef) -> Result<Candidate, RemoteError> {
        let data = self.files.download(&file.id).await?;
        let file_name = ensure_extension(&file.name, &file.mime_type);
        let extraction = self.parser.parse_bytes(&file_name, &data).await;

        Ok(Candidate::from_extraction(
            extraction,
            Some(file.id.clone()),
            Some(file.name.clone()),
        ))
    }
}

/// Map a candidate to its spreadsheet row, in header-column order.
fn candidate_row(candidate: &Candidate) -> Vec<String> {
    vec![
        candidate.name.clone().unwrap_or_default(),
        candidate
            .file_id
            .as_deref()
            .map(DriveClient::file_view_url)
            .unwrap_or_default(),
        candidate.phone.clone().unwrap_or_default(),
        candidate.email.clone().unwrap_or_default(),
        candidate.linked_in.clone().unwrap_or_default(),
        candidate.git_hub.clone().unwrap_or_default(),
    ]
}
