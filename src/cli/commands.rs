//! CLI commands implementation.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::config::{resolve_data_dir, Settings};
use crate::jobs::{BatchService, JobStore};
use crate::models::{BatchRequest, JobState};
use crate::ocr::TesseractOcr;
use crate::parser::{PdfTextExtractor, ResumeParser};
use crate::remote::{DriveClient, SheetsClient, StoredTokenProvider, TokenProvider};

const USER_AGENT: &str = concat!("cvharvest/", env!("CARGO_PKG_VERSION"));

#[derive(Parser)]
#[command(name = "cvh")]
#[command(about = "Resume acquisition and candidate extraction system")]
#[command(version)]
pub struct Cli {
    /// Data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a local resume file and print the extracted candidate
    Parse {
        /// Path to a .pdf or .docx file
        file: PathBuf,
    },

    /// Process every resume in a remote folder into a spreadsheet
    Batch {
        /// Remote folder ID to enumerate
        folder_id: String,
        /// Existing spreadsheet ID to append to (created if omitted)
        #[arg(short, long)]
        spreadsheet: Option<String>,
        /// Poll interval while waiting, in seconds
        #[arg(long, default_value = "2")]
        poll_seconds: u64,
    },

    /// Show the status of a batch job
    Status {
        /// Job ID
        job_id: String,
    },

    /// Print a completed job's results as JSON
    Results {
        /// Job ID
        job_id: String,
    },

    /// List known batch jobs, newest first
    Jobs,

    /// Manage stored API credentials
    Auth {
        #[command(subcommand)]
        command: AuthCommands,
    },

    /// Show or change settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Check whether the OCR binary is installed
    OcrCheck,
}

#[derive(Subcommand)]
enum AuthCommands {
    /// Store an access token obtained from your OAuth tooling
    Login {
        /// The access token value
        #[arg(long, env = "CVHARVEST_ACCESS_TOKEN")]
        token: String,
    },
    /// Remove stored credentials
    Logout,
    /// Show whether credentials are stored
    Status,
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Print effective settings as JSON
    Show,
    /// Set one setting and persist it
    Set {
        /// Setting name (e.g. max-retries, sheet-batch-size)
        key: String,
        /// New value
        value: String,
    },
}

pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let data_dir = resolve_data_dir(cli.data_dir.clone());
    let settings = Settings::load(&data_dir)?;

    match cli.command {
        Commands::Parse { file } => parse_command(settings, file).await,
        Commands::Batch {
            folder_id,
            spreadsheet,
            poll_seconds,
        } => batch_command(&data_dir, settings, folder_id, spreadsheet, poll_seconds).await,
        Commands::Status { job_id } => status_command(&data_dir, settings, &job_id).await,
        Commands::Results { job_id } => results_command(&data_dir, settings, &job_id).await,
        Commands::Jobs => jobs_command(&data_dir, settings).await,
        Commands::Auth { command } => auth_command(&data_dir, command).await,
        Commands::Config { command } => config_command(&data_dir, settings, command),
        Commands::OcrCheck => ocr_check_command(settings),
    }
}

fn build_parser(settings: &Settings) -> ResumeParser {
    let ocr = TesseractOcr::new(
        settings.tesseract_path.clone(),
        Duration::from_secs(settings.ocr_timeout_seconds),
    );
    ResumeParser::new(PdfTextExtractor::new(ocr))
}

fn build_service(data_dir: &Path, settings: Settings) -> anyhow::Result<Arc<BatchService>> {
    let http = reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .build()
        .context("failed to build HTTP client")?;

    let tokens = Arc::new(StoredTokenProvider::new(data_dir));
    let drive = Arc::new(DriveClient::new(http.clone(), tokens.clone()));
    let sheets = Arc::new(SheetsClient::new(http, tokens.clone()));
    let store = Arc::new(JobStore::new(data_dir, settings.job_retention_hours));
    let parser = build_parser(&settings);

    Ok(BatchService::new(
        settings, store, drive, sheets, tokens, parser,
    ))
}

async fn parse_command(settings: Settings, file: PathBuf) -> anyhow::Result<()> {
    let data = std::fs::read(&file).with_context(|| format!("failed to read {}", file.display()))?;
    let file_name = file
        .file_name()
        .map(|v| v.to_string_lossy().to_string())
        .unwrap_or_else(|| file.display().to_string());

    let parser = build_parser(&settings);
    let extraction = parser.parse_bytes(&file_name, &data).await;
    println!("{}", serde_json::to_string_pretty(&extraction)?);
    Ok(())
}

async fn batch_command(
    data_dir: &Path,
    settings: Settings,
    folder_id: String,
    spreadsheet: Option<String>,
    poll_seconds: u64,
) -> anyhow::Result<()> {
    let service = build_service(data_dir, settings)?;

    let job_id = service
        .start_batch_job(BatchRequest {
            folder_id,
            spreadsheet_id: spreadsheet,
        })
        .await?;

    println!("{} {}", style("Started job").green().bold(), job_id);

    let bar = ProgressBar::new(100);
    bar.set_style(
        ProgressStyle::with_template("{spinner} [{bar:40}] {pos}% {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );

    let poll = Duration::from_secs(poll_seconds.max(1));
    let final_status = loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                bar.set_message("canceling...".to_string());
                service.cancel_job(&job_id).await;
            }
            _ = tokio::time::sleep(poll) => {}
        }

        let status = service.job_status(&job_id).await?;
        bar.set_position(status.progress.max(0) as u64);
        bar.set_message(format!(
            "{}/{} files",
            status.processed_files, status.total_files
        ));
        if status.state.is_terminal() {
            break status;
        }
    };
    bar.finish_and_clear();

    service.shutdown().await;

    match final_status.state {
        JobState::Completed => {
            println!(
                "{} {} files processed in {:.1}s",
                style("Completed:").green().bold(),
                final_status.processed_files,
                final_status.duration_seconds.unwrap_or_default(),
            );
            if let Some(sheet_id) = final_status.spreadsheet_id {
                println!("Spreadsheet: https://docs.google.com/spreadsheets/d/{sheet_id}");
            }
        }
        state => {
            println!(
                "{} job ended {}: {}",
                style("Error:").red().bold(),
                state.as_str(),
                final_status.error.unwrap_or_default(),
            );
        }
    }

    Ok(())
}

async fn status_command(data_dir: &Path, settings: Settings, job_id: &str) -> anyhow::Result<()> {
    let store = JobStore::new(data_dir, settings.job_retention_hours);
    let status = store
        .load_status(job_id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("job not found: {job_id}"))?;
    println!("{}", serde_json::to_string_pretty(&status)?);
    Ok(())
}

async fn results_command(data_dir: &Path, settings: Settings, job_id: &str) -> anyhow::Result<()> {
    let store = JobStore::new(data_dir, settings.job_retention_hours);
    match store.load_results(job_id).await? {
        Some(results) => {
            println!("{}", serde_json::to_string_pretty(&results)?);
            Ok(())
        }
        None => match store.load_status(job_id).await? {
            Some(status) if status.state == JobState::Completed => {
                println!("[]");
                Ok(())
            }
            Some(status) => anyhow::bail!("job {job_id} is {}", status.state.as_str()),
            None => anyhow::bail!("job not found: {job_id}"),
        },
    }
}

async fn jobs_command(data_dir: &Path, settings: Settings) -> anyhow::Result<()> {
    let store = JobStore::new(data_dir, settings.job_retention_hours);
    let jobs = store.list_jobs().await?;
    if jobs.is_empty() {
        println!("No jobs recorded.");
        return Ok(());
    }
    for job_id in jobs {
        match store.load_status(&job_id).await? {
            Some(status) => println!(
                "{}  {:<10}  {:>3}%  {}/{} files",
                job_id,
                status.state.as_str(),
                status.progress,
                status.processed_files,
                status.total_files,
            ),
            None => println!("{job_id}  (no status)"),
        }
    }
    Ok(())
}

async fn auth_command(data_dir: &Path, command: AuthCommands) -> anyhow::Result<()> {
    let provider = StoredTokenProvider::new(data_dir);
    match command {
        AuthCommands::Login { token } => {
            provider.store(&token).await?;
            println!("{}", style("Token stored.").green());
        }
        AuthCommands::Logout => {
            provider.clear().await?;
            println!("Stored credentials removed.");
        }
        AuthCommands::Status => {
            if provider.is_signed_in().await {
                println!("{}", style("Signed in.").green());
            } else {
                println!("Not signed in. Run `cvh auth login --token <TOKEN>`.");
            }
        }
    }
    Ok(())
}

fn config_command(
    data_dir: &Path,
    settings: Settings,
    command: ConfigCommands,
) -> anyhow::Result<()> {
    match command {
        ConfigCommands::Show => {
            println!("{}", serde_json::to_string_pretty(&settings)?);
            Ok(())
        }
        ConfigCommands::Set { key, value } => {
            let mut settings = settings;
            apply_setting(&mut settings, &key, &value)?;
            let settings = settings.sanitized();
            settings.save(data_dir)?;
            println!("{}", serde_json::to_string_pretty(&settings)?);
            Ok(())
        }
    }
}

fn apply_setting(settings: &mut Settings, key: &str, value: &str) -> anyhow::Result<()> {
    match key {
        "max-concurrent-files" => settings.max_concurrent_files = value.parse()?,
        "sheet-batch-size" => settings.sheet_batch_size = value.parse()?,
        "max-retries" => settings.max_retries = value.parse()?,
        "retry-delay-seconds" => settings.retry_delay_seconds = value.parse()?,
        "job-retention-hours" => settings.job_retention_hours = value.parse()?,
        "tesseract-path" => settings.tesseract_path = value.to_string(),
        "ocr-timeout-seconds" => settings.ocr_timeout_seconds = value.parse()?,
        other => anyhow::bail!("unknown setting: {other}"),
    }
    Ok(())
}

fn ocr_check_command(settings: Settings) -> anyhow::Result<()> {
    let ocr = TesseractOcr::new(
        settings.tesseract_path,
        Duration::from_secs(settings.ocr_timeout_seconds),
    );
    if ocr.is_available() {
        println!(
            "{} {} found",
            style("OK:").green().bold(),
            ocr.executable()
        );
    } else {
        println!(
            "{} {} not found (install tesseract-ocr or set tesseract-path)",
            style("Missing:").red().bold(),
            ocr.executable()
        );
    }
    Ok(())
}
