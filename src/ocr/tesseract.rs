//! Tesseract OCR invocation.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use anyhow::Context;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::warn;

/// OCR engine backed by the Tesseract command-line binary.
#[derive(Debug, Clone)]
pub struct TesseractOcr {
    executable: String,
    timeout: Duration,
}

impl TesseractOcr {
    /// Create an engine around the given executable path or name.
    pub fn new(executable: impl Into<String>, timeout: Duration) -> Self {
        let executable = executable.into();
        let executable = if executable.trim().is_empty() {
            "tesseract".to_string()
        } else {
            executable
        };
        Self {
            executable,
            timeout,
        }
    }

    /// Check whether the configured binary resolves on PATH.
    pub fn is_available(&self) -> bool {
        which::which(&self.executable).is_ok()
    }

    /// The configured executable path or name.
    pub fn executable(&self) -> &str {
        &self.executable
    }

    /// Run OCR over PDF bytes.
    ///
    /// Returns empty text (not an error) when the subprocess times out or
    /// exits non-zero, so callers can proceed with a sparse document.
    pub async fn extract_text(&self, pdf_bytes: &[u8]) -> anyhow::Result<String> {
        let temp_dir = tempfile::Builder::new()
            .prefix("cvharvest-ocr-")
            .tempdir()
            .context("failed to create OCR temp dir")?;

        let input_path: PathBuf = temp_dir.path().join("document.pdf");
        tokio::fs::write(&input_path, pdf_bytes).await?;

        let mut command = Command::new(&self.executable);
        command
            .arg(&input_path)
            .arg("stdout")
            .args(["-l", "eng"])
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = match timeout(self.timeout, command.output()).await {
            Ok(result) => result.context("failed to spawn tesseract")?,
            Err(_) => {
                warn!("OCR timed out after {:?}", self.timeout);
                return Ok(String::new());
            }
        };

        if !output.status.success() {
            warn!(
                "tesseract exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
            return Ok(String::new());
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}
