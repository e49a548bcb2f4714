//! Candidate models for resume extraction results.
//!
//! A `ResumeExtraction` is the raw outcome of parsing one document;
//! a `Candidate` is its persisted projection, tied back to the remote
//! file it came from.

use serde::{Deserialize, Serialize};

/// Fields extracted from a single resume document, with a confidence
/// score and any non-fatal errors collected along the way.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumeExtraction {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub linked_in: Option<String>,
    pub git_hub: Option<String>,
    /// Score in [0, 1] reflecting how many fields were found.
    pub confidence: f64,
    /// Whether OCR was needed to get usable text out of the document.
    pub ocr_used: bool,
    #[serde(default)]
    pub errors: Vec<String>,
}

impl ResumeExtraction {
    /// An extraction that produced nothing, carrying the errors that
    /// explain why.
    pub fn failed(errors: Vec<String>, ocr_used: bool) -> Self {
        Self {
            name: None,
            email: None,
            phone: None,
            linked_in: None,
            git_hub: None,
            confidence: 0.0,
            ocr_used,
            errors,
        }
    }
}

/// One extracted-and-scored resume record within a batch job.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    /// Remote file identifier, when the candidate came from a batch job.
    pub file_id: Option<String>,
    /// Display name of the source document.
    pub source_file: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub linked_in: Option<String>,
    pub git_hub: Option<String>,
    pub confidence: f64,
    #[serde(default)]
    pub errors: Vec<String>,
}

impl Candidate {
    /// Build a candidate from a per-document extraction.
    pub fn from_extraction(
        extraction: ResumeExtraction,
        file_id: Option<String>,
        source_file: Option<String>,
    ) -> Self {
        Self {
            file_id,
            source_file,
            name: extraction.name,
            email: extraction.email,
            phone: extraction.phone,
            linked_in: extraction.linked_in,
            git_hub: extraction.git_hub,
            confidence: extraction.confidence,
            errors: extraction.errors,
        }
    }

    /// A zero-confidence candidate for a file that could not be processed.
    pub fn empty(
        source_file: Option<String>,
        file_id: Option<String>,
        errors: Vec<String>,
    ) -> Self {
        Self {
            file_id,
            source_file,
            name: None,
            email: None,
            phone: None,
            linked_in: None,
            git_hub: None,
            confidence: 0.0,
            errors,
        }
    }
}
