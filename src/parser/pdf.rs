//! PDF text extraction with OCR fallback.

use std::sync::LazyLock;

use regex::Regex;

use crate::ocr::TesseractOcr;

/// Minimum characters of extracted text before the document is treated
/// as image-only and sent to OCR.
const MIN_EXTRACTED_CHARS: usize = 50;

static URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"https?://[^\s<>'"\)]+"#).unwrap());

/// Extracts text from PDF bytes, falling back to OCR for scanned
/// documents.
pub struct PdfTextExtractor {
    ocr: TesseractOcr,
}

impl PdfTextExtractor {
    pub fn new(ocr: TesseractOcr) -> Self {
        Self { ocr }
    }

    /// Extract text, OCRing when structured extraction yields too little.
    ///
    /// Returns the text and whether OCR was used. Hyperlink targets found
    /// in the raw bytes are appended to the structured text, since link
    /// annotations don't always surface through page-text extraction.
    pub async fn extract_with_fallback(&self, data: &[u8]) -> anyhow::Result<(String, bool)> {
        let mut ocr_used = false;

        let text = match pdf_extract::extract_text_from_mem(data) {
            Ok(mut text) => {
                let links = scan_raw_urls(data);
                if !links.is_empty() {
                    text.push('\n');
                    text.push_str(&links.join("\n"));
                }

                if text.trim().len() < MIN_EXTRACTED_CHARS {
                    ocr_used = true;
                    self.ocr.extract_text(data).await?
                } else {
                    text
                }
            }
            Err(_) => {
                ocr_used = true;
                self.ocr.extract_text(data).await?
            }
        };

        Ok((text, ocr_used))
    }
}

/// Scan raw PDF bytes for URL-shaped substrings.
///
/// Link annotations live in object streams that text extraction skips;
/// a byte-level scan recovers the common uncompressed cases. Duplicates
/// are dropped case-insensitively, first occurrence wins.
fn scan_raw_urls(data: &[u8]) -> Vec<String> {
    let raw = String::from_utf8_lossy(data);
    let mut urls: Vec<String> = Vec::new();
    for m in URL_RE.find_iter(&raw) {
        let found = m.as_str().to_string();
        if !urls.iter().any(|u| u.eq_ignore_ascii_case(&found)) {
            urls.push(found);
        }
    }
    urls
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_url_scan_dedupes_case_insensitively() {
        let data = b"/URI (https://github.com/JohnDoe) junk /URI (https://GITHUB.com/johndoe)";
        let urls = scan_raw_urls(data);
        assert_eq!(urls, vec!["https://github.com/JohnDoe".to_string()]);
    }

    #[test]
    fn test_raw_url_scan_stops_at_delimiters() {
        let data = b"<link href='https://www.linkedin.com/in/jane-smith'>";
        let urls = scan_raw_urls(data);
        assert_eq!(urls, vec!["https://www.linkedin.com/in/jane-smith"]);
    }
}
