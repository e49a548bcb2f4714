//! Resume parsing pipeline.
//!
//! Turns raw document bytes into a scored `ResumeExtraction`:
//! bytes -> plain text (PDF with OCR fallback, or DOCX) -> field
//! extraction -> confidence score. Every failure is captured inside the
//! result at file granularity; nothing here propagates an error to the
//! caller. That boundary is what lets a batch tolerate individual bad
//! files.

mod docx;
mod pdf;

pub use pdf::PdfTextExtractor;

use std::path::Path;

use crate::extract;
use crate::models::ResumeExtraction;

/// Parses a single resume document into extracted fields.
pub struct ResumeParser {
    pdf: PdfTextExtractor,
}

impl ResumeParser {
    pub fn new(pdf: PdfTextExtractor) -> Self {
        Self { pdf }
    }

    /// Parse document bytes, routed by the file name's extension.
    ///
    /// Unsupported extensions and extraction failures yield a
    /// zero-confidence result carrying the error, never an `Err`.
    pub async fn parse_bytes(&self, file_name: &str, data: &[u8]) -> ResumeExtraction {
        let mut errors = Vec::new();
        let mut ocr_used = false;

        let extension = Path::new(file_name)
            .extension()
            .and_then(|v| v.to_str())
            .map(|v| v.to_ascii_lowercase())
            .unwrap_or_default();

        let text = match extension.as_str() {
            "pdf" => match self.pdf.extract_with_fallback(data).await {
                Ok((text, used_ocr)) => {
                    ocr_used = used_ocr;
                    text
                }
                Err(err) => {
                    errors.push(format!("Parse error: {err}"));
                    String::new()
                }
            },
            "docx" => match docx::extract_text(data) {
                Ok(text) => text,
                Err(err) => {
                    errors.push(format!("Parse error: {err}"));
                    String::new()
                }
            },
            _ => {
                errors.push(format!("Unsupported file type: {file_name}"));
                String::new()
            }
        };

        if text.is_empty() && !errors.is_empty() {
            return ResumeExtraction::failed(errors, ocr_used);
        }

        let (email, phone, linked_in, git_hub) = extract::extract_fields(&text);
        let name = extract::guess_name(&text);
        let confidence = extract::score_confidence(
            name.as_deref(),
            email.as_deref(),
            phone.as_deref(),
            linked_in.as_deref(),
            git_hub.as_deref(),
            ocr_used,
        );

        ResumeExtraction {
            name,
            email,
            phone,
            linked_in,
            git_hub,
            confidence,
            ocr_used,
            errors,
        }
    }
}
