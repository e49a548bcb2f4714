//! End-to-end batch orchestration tests.
//!
//! Drives `BatchService` against in-memory collaborator fakes so the
//! whole pipeline runs without network, OCR, or real credentials.

use std::collections::HashMap;
use std::io::{Cursor, Write};
use std::path::Path;
use std::sync::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;

use cvharvest::config::Settings;
use cvharvest::jobs::{BatchService, JobStore};
use cvharvest::models::{BatchRequest, JobState, JobStatus, RemoteFileRef};
use cvharvest::ocr::TesseractOcr;
use cvharvest::parser::{PdfTextExtractor, ResumeParser};
use cvharvest::remote::{FileSource, RemoteError, SheetWriter, TokenProvider};

const DOCX_MIME: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

struct FakeTokens;

#[async_trait]
impl TokenProvider for FakeTokens {
    async fn access_token(&self) -> Result<String, RemoteError> {
        Ok("test-token".to_string())
    }

    async fn clear(&self) -> Result<(), RemoteError> {
        Ok(())
    }
}

#[derive(Default)]
struct FolderFixture {
    folders: HashMap<String, Vec<RemoteFileRef>>,
    payloads: HashMap<String, Vec<u8>>,
    /// All downloads fail with this status when set.
    fail_status: Option<u16>,
    download_delay: Option<Duration>,
    attempts: Mutex<HashMap<String, usize>>,
    attempt_times: Mutex<Vec<Instant>>,
    list_log: Mutex<Vec<String>>,
}

impl FolderFixture {
    fn attempts_for(&self, file_id: &str) -> usize {
        self.attempts
            .lock()
            .unwrap()
            .get(file_id)
            .copied()
            .unwrap_or(0)
    }
}

#[async_trait]
impl FileSource for FolderFixture {
    async fn list_folder(&self, folder_id: &str) -> Result<Vec<RemoteFileRef>, RemoteError> {
        self.list_log.lock().unwrap().push(folder_id.to_string());
        Ok(self.folders.get(folder_id).cloned().unwrap_or_default())
    }

    async fn download(&self, file_id: &str) -> Result<Vec<u8>, RemoteError> {
        {
            let mut attempts = self.attempts.lock().unwrap();
            *attempts.entry(file_id.to_string()).or_insert(0) += 1;
        }
        self.attempt_times.lock().unwrap().push(Instant::now());

        if let Some(delay) = self.download_delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(status) = self.fail_status {
            return Err(RemoteError::Status {
                status,
                body: "simulated failure".to_string(),
            });
        }

        self.payloads.get(file_id).cloned().ok_or(RemoteError::Status {
            status: 404,
            body: "no such file".to_string(),
        })
    }
}

#[derive(Default)]
struct SheetFixture {
    created_titles: Mutex<Vec<String>>,
    appends: Mutex<Vec<(String, Vec<Vec<String>>, bool)>>,
}

impl SheetFixture {
    fn appended_data_rows(&self) -> Vec<Vec<String>> {
        self.appends
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, _, includes_header)| !includes_header)
            .flat_map(|(_, rows, _)| rows.clone())
            .collect()
    }
}

#[async_trait]
impl SheetWriter for SheetFixture {
    async fn create_spreadsheet(&self, title: &str) -> Result<String, RemoteError> {
        self.created_titles.lock().unwrap().push(title.to_string());
        Ok("sheet-test".to_string())
    }

    async fn append_rows(
        &self,
        spreadsheet_id: &str,
        rows: &[Vec<String>],
        rows_include_header: bool,
    ) -> Result<(), RemoteError> {
        self.appends.lock().unwrap().push((
            spreadsheet_id.to_string(),
            rows.to_vec(),
            rows_include_header,
        ));
        Ok(())
    }
}

/// Minimal DOCX bytes with one paragraph per entry.
fn docx_bytes(paragraphs: &[&str]) -> Vec<u8> {
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = zip::ZipWriter::new(&mut cursor);
        let options = zip::write::SimpleFileOptions::default();
        writer.start_file("word/document.xml", options).unwrap();
        let body: String = paragraphs
            .iter()
            .map(|p| format!("<w:p><w:r><w:t>{p}</w:t></w:r></w:p>"))
            .collect();
        writer
            .write_all(
                format!("<?xml version=\"1.0\"?><w:document><w:body>{body}</w:body></w:document>")
                    .as_bytes(),
            )
            .unwrap();
        writer.finish().unwrap();
    }
    cursor.into_inner()
}

fn docx_ref(id: &str, name: &str) -> RemoteFileRef {
    RemoteFileRef {
        id: id.to_string(),
        name: name.to_string(),
        mime_type: DOCX_MIME.to_string(),
    }
}

fn test_settings() -> Settings {
    Settings {
        max_concurrent_files: 1,
        sheet_batch_size: 1,
        max_retries: 3,
        retry_delay_seconds: 0.1,
        job_retention_hours: 24,
        tesseract_path: "tesseract".to_string(),
        ocr_timeout_seconds: 5,
    }
}

fn build_service(
    data_dir: &Path,
    settings: Settings,
    folder: Arc<FolderFixture>,
    sheets: Arc<SheetFixture>,
) -> Arc<BatchService> {
    let store = Arc::new(JobStore::new(data_dir, settings.job_retention_hours));
    let ocr = TesseractOcr::new(
        settings.tesseract_path.clone(),
        Duration::from_secs(settings.ocr_timeout_seconds),
    );
    let parser = ResumeParser::new(PdfTextExtractor::new(ocr));
    BatchService::new(settings, store, folder, sheets, Arc::new(FakeTokens), parser)
}

/// Poll a job's status until it reaches a terminal state, recording every
/// observed status along the way.
async fn poll_to_terminal(service: &BatchService, job_id: &str) -> Vec<JobStatus> {
    let deadline = Instant::now() + Duration::from_secs(15);
    let mut observed = Vec::new();

    loop {
        assert!(Instant::now() < deadline, "job {job_id} never finished");
        let status = service.job_status(job_id).await.unwrap();
        let terminal = status.state.is_terminal();
        observed.push(status);
        if terminal {
            return observed;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

#[tokio::test]
async fn zero_file_folder_completes_empty() {
    let temp = tempfile::tempdir().unwrap();
    let folder = Arc::new(FolderFixture::default());
    let sheets = Arc::new(SheetFixture::default());
    let service = build_service(temp.path(), test_settings(), folder, sheets.clone());

    let job_id = service
        .start_batch_job(BatchRequest {
            folder_id: "empty-folder".to_string(),
            spreadsheet_id: None,
        })
        .await
        .unwrap();

    let observed = poll_to_terminal(&service, &job_id).await;
    let last = observed.last().unwrap();
    assert_eq!(last.state, JobState::Completed);
    assert_eq!(last.total_files, 0);
    assert_eq!(last.processed_files, 0);
    assert_eq!(last.progress, 100);
    assert!(last.completed_at.is_some());
    assert!(last.duration_seconds.is_some());

    let results = service.job_results(&job_id).await.unwrap();
    assert!(results.is_empty());

    // No files means no spreadsheet was ever needed.
    assert!(sheets.created_titles.lock().unwrap().is_empty());

    service.shutdown().await;
}

#[tokio::test]
async fn two_files_progress_is_monotone_and_rows_in_listing_order() {
    let temp = tempfile::tempdir().unwrap();

    let mut folder = FolderFixture::default();
    folder.folders.insert(
        "folder-1".to_string(),
        vec![docx_ref("file-1", "john.docx"), docx_ref("file-2", "jane.docx")],
    );
    folder.payloads.insert(
        "file-1".to_string(),
        docx_bytes(&["John Doe", "Email: john.doe@example.com"]),
    );
    folder.payloads.insert(
        "file-2".to_string(),
        docx_bytes(&["Jane Smith", "Email: jane.smith@example.com"]),
    );
    folder.download_delay = Some(Duration::from_millis(30));

    let folder = Arc::new(folder);
    let sheets = Arc::new(SheetFixture::default());
    let service = build_service(temp.path(), test_settings(), folder, sheets.clone());

    let job_id = service
        .start_batch_job(BatchRequest {
            folder_id: "folder-1".to_string(),
            spreadsheet_id: None,
        })
        .await
        .unwrap();

    let observed = poll_to_terminal(&service, &job_id).await;

    for pair in observed.windows(2) {
        assert!(
            pair[1].processed_files >= pair[0].processed_files,
            "processed files went backwards: {} -> {}",
            pair[0].processed_files,
            pair[1].processed_files,
        );
        assert!(pair[1].progress >= pair[0].progress);
    }

    let last = observed.last().unwrap();
    assert_eq!(last.state, JobState::Completed);
    assert_eq!(last.total_files, 2);
    assert_eq!(last.processed_files, 2);
    assert_eq!(last.progress, 100);
    assert_eq!(last.results_count, Some(2));

    // Pre-terminal progress stays below 100.
    for status in &observed[..observed.len() - 1] {
        assert!(status.progress <= 99);
    }

    // A spreadsheet was created and got the header first.
    assert_eq!(sheets.created_titles.lock().unwrap().len(), 1);
    let appends = sheets.appends.lock().unwrap().clone();
    assert!(appends[0].2, "first append should carry the header");
    assert_eq!(appends[0].1[0][0], "Name");

    // Data rows arrive in file-listing order despite concurrency.
    let rows = sheets.appended_data_rows();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0][0], "John Doe");
    assert!(rows[0][1].contains("file-1"));
    assert_eq!(rows[0][3], "john.doe@example.com");
    assert_eq!(rows[1][0], "Jane Smith");
    assert!(rows[1][1].contains("file-2"));

    let results = service.job_results(&job_id).await.unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].source_file.as_deref(), Some("john.docx"));
    assert!(results[0].confidence > 0.0);

    service.shutdown().await;
}

#[tokio::test]
async fn retryable_failure_is_retried_with_growing_delays() {
    let temp = tempfile::tempdir().unwrap();

    let mut folder = FolderFixture::default();
    folder
        .folders
        .insert("folder-1".to_string(), vec![docx_ref("flaky", "flaky.docx")]);
    folder.fail_status = Some(503);
    let folder = Arc::new(folder);

    let sheets = Arc::new(SheetFixture::default());
    let service = build_service(
        temp.path(),
        test_settings(),
        folder.clone(),
        sheets.clone(),
    );

    let job_id = service
        .start_batch_job(BatchRequest {
            folder_id: "folder-1".to_string(),
            spreadsheet_id: None,
        })
        .await
        .unwrap();

    let observed = poll_to_terminal(&service, &job_id).await;
    let last = observed.last().unwrap();

    // Per-file failure degrades the candidate; it does not fail the job.
    assert_eq!(last.state, JobState::Completed);
    assert_eq!(folder.attempts_for("flaky"), 3);

    let times = folder.attempt_times.lock().unwrap().clone();
    assert_eq!(times.len(), 3);
    let first_gap = times[1] - times[0];
    let second_gap = times[2] - times[1];
    assert!(
        second_gap > first_gap,
        "backoff delays should grow: {first_gap:?} then {second_gap:?}"
    );

    let results = service.job_results(&job_id).await.unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].confidence, 0.0);
    assert!(!results[0].errors.is_empty());
    assert!(results[0].errors[0].contains("503"));

    service.shutdown().await;
}

#[tokio::test]
async fn non_retryable_failure_gets_single_attempt() {
    let temp = tempfile::tempdir().unwrap();

    let mut folder = FolderFixture::default();
    folder
        .folders
        .insert("folder-1".to_string(), vec![docx_ref("gone", "gone.docx")]);
    folder.fail_status = Some(404);
    let folder = Arc::new(folder);

    let sheets = Arc::new(SheetFixture::default());
    let service = build_service(
        temp.path(),
        test_settings(),
        folder.clone(),
        sheets.clone(),
    );

    let job_id = service
        .start_batch_job(BatchRequest {
            folder_id: "folder-1".to_string(),
            spreadsheet_id: None,
        })
        .await
        .unwrap();

    poll_to_terminal(&service, &job_id).await;
    assert_eq!(folder.attempts_for("gone"), 1);

    let results = service.job_results(&job_id).await.unwrap();
    assert!(results[0].errors[0].contains("404"));

    service.shutdown().await;
}

#[tokio::test]
async fn missing_file_id_is_skipped_without_download() {
    let temp = tempfile::tempdir().unwrap();

    let mut folder = FolderFixture::default();
    folder.folders.insert(
        "folder-1".to_string(),
        vec![RemoteFileRef {
            id: "".to_string(),
            name: "mystery.docx".to_string(),
            mime_type: DOCX_MIME.to_string(),
        }],
    );
    let folder = Arc::new(folder);

    let sheets = Arc::new(SheetFixture::default());
    let service = build_service(
        temp.path(),
        test_settings(),
        folder.clone(),
        sheets.clone(),
    );

    let job_id = service
        .start_batch_job(BatchRequest {
            folder_id: "folder-1".to_string(),
            spreadsheet_id: None,
        })
        .await
        .unwrap();

    poll_to_terminal(&service, &job_id).await;

    assert!(folder.attempts.lock().unwrap().is_empty());
    let results = service.job_results(&job_id).await.unwrap();
    assert_eq!(results[0].errors, vec!["Missing file ID".to_string()]);
    assert_eq!(results[0].confidence, 0.0);
    assert!(results[0].file_id.is_none());

    service.shutdown().await;
}

#[tokio::test]
async fn blank_folder_id_is_rejected_synchronously() {
    let temp = tempfile::tempdir().unwrap();
    let folder = Arc::new(FolderFixture::default());
    let sheets = Arc::new(SheetFixture::default());
    let service = build_service(temp.path(), test_settings(), folder, sheets);

    let err = service
        .start_batch_job(BatchRequest {
            folder_id: "   ".to_string(),
            spreadsheet_id: None,
        })
        .await
        .unwrap_err();
    assert!(err.to_string().contains("folderId"));

    // Nothing was enqueued or persisted.
    assert!(service.list_jobs().await.unwrap().is_empty());

    service.shutdown().await;
}

#[tokio::test]
async fn results_lookup_errors_match_job_state() {
    let temp = tempfile::tempdir().unwrap();

    let mut folder = FolderFixture::default();
    folder
        .folders
        .insert("folder-1".to_string(), vec![docx_ref("slow", "slow.docx")]);
    folder
        .payloads
        .insert("slow".to_string(), docx_bytes(&["Slow Sam"]));
    folder.download_delay = Some(Duration::from_millis(300));
    let folder = Arc::new(folder);

    let sheets = Arc::new(SheetFixture::default());
    let service = build_service(temp.path(), test_settings(), folder, sheets);

    let missing = service.job_results("no-such-job").await.unwrap_err();
    assert!(missing.to_string().contains("not found"));

    let job_id = service
        .start_batch_job(BatchRequest {
            folder_id: "folder-1".to_string(),
            spreadsheet_id: None,
        })
        .await
        .unwrap();

    // The job is still pending or processing here.
    let premature = service.job_results(&job_id).await.unwrap_err();
    assert!(premature.to_string().contains("not completed"));

    poll_to_terminal(&service, &job_id).await;
    let results = service.job_results(&job_id).await.unwrap();
    assert_eq!(results.len(), 1);

    service.shutdown().await;
}

#[tokio::test]
async fn jobs_run_in_enqueue_order() {
    let temp = tempfile::tempdir().unwrap();

    let mut folder = FolderFixture::default();
    folder
        .folders
        .insert("folder-a".to_string(), vec![docx_ref("a1", "a1.docx")]);
    folder
        .folders
        .insert("folder-b".to_string(), vec![docx_ref("b1", "b1.docx")]);
    folder.payloads.insert("a1".to_string(), docx_bytes(&["Amy Able"]));
    folder.payloads.insert("b1".to_string(), docx_bytes(&["Ben Best"]));
    let folder = Arc::new(folder);

    let sheets = Arc::new(SheetFixture::default());
    let service = build_service(
        temp.path(),
        test_settings(),
        folder.clone(),
        sheets.clone(),
    );

    let first = service
        .start_batch_job(BatchRequest {
            folder_id: "folder-a".to_string(),
            spreadsheet_id: None,
        })
        .await
        .unwrap();
    let second = service
        .start_batch_job(BatchRequest {
            folder_id: "folder-b".to_string(),
            spreadsheet_id: None,
        })
        .await
        .unwrap();

    poll_to_terminal(&service, &first).await;
    poll_to_terminal(&service, &second).await;

    let log = folder.list_log.lock().unwrap().clone();
    assert_eq!(log, vec!["folder-a".to_string(), "folder-b".to_string()]);

    service.shutdown().await;
}

#[tokio::test]
async fn supplied_spreadsheet_is_reused_not_recreated() {
    let temp = tempfile::tempdir().unwrap();

    let mut folder = FolderFixture::default();
    folder
        .folders
        .insert("folder-1".to_string(), vec![docx_ref("f1", "f1.docx")]);
    folder
        .payloads
        .insert("f1".to_string(), docx_bytes(&["Cara Cole", "cara@example.com"]));
    let folder = Arc::new(folder);

    let sheets = Arc::new(SheetFixture::default());
    let service = build_service(temp.path(), test_settings(), folder, sheets.clone());

    let job_id = service
        .start_batch_job(BatchRequest {
            folder_id: "folder-1".to_string(),
            spreadsheet_id: Some("existing-sheet".to_string()),
        })
        .await
        .unwrap();

    let observed = poll_to_terminal(&service, &job_id).await;
    assert_eq!(observed.last().unwrap().state, JobState::Completed);
    assert_eq!(
        observed.last().unwrap().spreadsheet_id.as_deref(),
        Some("existing-sheet")
    );

    assert!(sheets.created_titles.lock().unwrap().is_empty());
    let appends = sheets.appends.lock().unwrap().clone();
    assert!(appends.iter().all(|(id, _, _)| id == "existing-sheet"));
    assert!(appends.iter().all(|(_, _, includes_header)| !includes_header));

    service.shutdown().await;
}

#[tokio::test]
async fn cancellation_lands_in_revoked() {
    let temp = tempfile::tempdir().unwrap();

    let mut folder = FolderFixture::default();
    let files: Vec<RemoteFileRef> = (0..6)
        .map(|i| docx_ref(&format!("f{i}"), &format!("f{i}.docx")))
        .collect();
    for file in &files {
        folder
            .payloads
            .insert(file.id.clone(), docx_bytes(&["Person Name"]));
    }
    folder.folders.insert("folder-1".to_string(), files);
    folder.download_delay = Some(Duration::from_millis(100));
    let folder = Arc::new(folder);

    let sheets = Arc::new(SheetFixture::default());
    let service = build_service(temp.path(), test_settings(), folder, sheets);

    let job_id = service
        .start_batch_job(BatchRequest {
            folder_id: "folder-1".to_string(),
            spreadsheet_id: None,
        })
        .await
        .unwrap();

    // Give the worker a moment to pick the job up, then cancel it.
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert!(service.cancel_job(&job_id).await);

    let observed = poll_to_terminal(&service, &job_id).await;
    let last = observed.last().unwrap();
    assert_eq!(last.state, JobState::Revoked);
    assert!(last.error.is_some());
    assert!(last.progress < 100);
    assert!(last.processed_files < last.total_files);

    service.shutdown().await;
}

#[tokio::test]
async fn parse_single_never_touches_the_store() {
    let temp = tempfile::tempdir().unwrap();
    let folder = Arc::new(FolderFixture::default());
    let sheets = Arc::new(SheetFixture::default());
    let service = build_service(temp.path(), test_settings(), folder, sheets);

    let candidate = service
        .parse_single(
            "resume.docx".to_string(),
            docx_bytes(&["Dana Drew", "Email: dana.drew@example.com"]),
        )
        .await;

    assert_eq!(candidate.name.as_deref(), Some("Dana Drew"));
    assert_eq!(candidate.email.as_deref(), Some("dana.drew@example.com"));
    assert!(candidate.file_id.is_none());
    assert!(service.list_jobs().await.unwrap().is_empty());

    service.shutdown().await;
}
