//! MIME type helpers for remote file metadata.

const PDF_MIME: &str = "application/pdf";
const DOCX_MIME: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

/// Whether a MIME type is one the parsing pipeline supports.
pub fn is_supported_mime(mime_type: &str) -> bool {
    mime_type == PDF_MIME || mime_type == DOCX_MIME
}

/// Give a file name the extension its MIME type implies, when missing.
///
/// Remote listings sometimes report names without extensions; the parser
/// routes on the extension, so it is reconstructed from the MIME type.
pub fn ensure_extension(file_name: &str, mime_type: &str) -> String {
    let lowered = file_name.to_ascii_lowercase();
    match mime_type {
        PDF_MIME if !lowered.ends_with(".pdf") => format!("{file_name}.pdf"),
        DOCX_MIME if !lowered.ends_with(".docx") => format!("{file_name}.docx"),
        _ => file_name.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_added_when_missing() {
        assert_eq!(ensure_extension("resume", PDF_MIME), "resume.pdf");
        assert_eq!(ensure_extension("resume", DOCX_MIME), "resume.docx");
    }

    #[test]
    fn test_existing_extension_kept() {
        assert_eq!(ensure_extension("resume.pdf", PDF_MIME), "resume.pdf");
        assert_eq!(ensure_extension("Resume.PDF", PDF_MIME), "Resume.PDF");
    }

    #[test]
    fn test_unknown_mime_left_alone() {
        assert_eq!(ensure_extension("notes", "text/plain"), "notes");
    }

    #[test]
    fn test_supported_mimes() {
        assert!(is_supported_mime(PDF_MIME));
        assert!(is_supported_mime(DOCX_MIME));
        assert!(!is_supported_mime("image/png"));
    }
}
