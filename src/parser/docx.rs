//! DOCX text extraction.
//!
//! A `.docx` file is a zip archive; the document body lives in
//! `word/document.xml`. Text runs are concatenated per paragraph in
//! document order. There is no OCR fallback for DOCX.

use std::io::{Cursor, Read};

use quick_xml::events::Event;
use quick_xml::Reader;

/// Extract paragraph text from DOCX bytes.
pub fn extract_text(data: &[u8]) -> anyhow::Result<String> {
    let cursor = Cursor::new(data);
    let mut archive = zip::ZipArchive::new(cursor)?;

    let mut document = archive.by_name("word/document.xml")?;
    let mut xml = String::new();
    document.read_to_string(&mut xml)?;

    let mut reader = Reader::from_str(&xml);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut paragraph = String::new();
    let mut paragraphs = Vec::new();
    let mut in_paragraph = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                if e.name().as_ref() == b"w:p" {
                    in_paragraph = true;
                    paragraph.clear();
                }
            }
            Ok(Event::End(e)) => {
                if e.name().as_ref() == b"w:p" {
                    if !paragraph.trim().is_empty() {
                        paragraphs.push(paragraph.trim().to_string());
                    }
                    paragraph.clear();
                    in_paragraph = false;
                }
            }
            Ok(Event::Text(e)) => {
                if in_paragraph {
                    paragraph.push_str(&e.unescape()?);
                }
            }
            Ok(Event::Eof) => break,
            Err(err) => return Err(err.into()),
            _ => {}
        }

        buf.clear();
    }

    Ok(paragraphs.join("\n"))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn docx_with_body(body_xml: &str) -> Vec<u8> {
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = zip::ZipWriter::new(&mut cursor);
            let options = zip::write::SimpleFileOptions::default();
            writer.start_file("word/document.xml", options).unwrap();
            writer
                .write_all(
                    format!(
                        "<?xml version=\"1.0\"?><w:document><w:body>{body_xml}</w:body></w:document>"
                    )
                    .as_bytes(),
                )
                .unwrap();
            writer.finish().unwrap();
        }
        cursor.into_inner()
    }

    #[test]
    fn test_paragraphs_in_document_order() {
        let data = docx_with_body(
            "<w:p><w:r><w:t>John Doe</w:t></w:r></w:p>\
             <w:p><w:r><w:t>Email: </w:t></w:r><w:r><w:t>john@example.com</w:t></w:r></w:p>",
        );
        let text = extract_text(&data).unwrap();
        assert_eq!(text, "John Doe\nEmail: john@example.com");
    }

    #[test]
    fn test_empty_paragraphs_skipped() {
        let data = docx_with_body("<w:p></w:p><w:p><w:r><w:t>Jane Smith</w:t></w:r></w:p>");
        let text = extract_text(&data).unwrap();
        assert_eq!(text, "Jane Smith");
    }

    #[test]
    fn test_not_a_zip_is_an_error() {
        assert!(extract_text(b"plain bytes, not an archive").is_err());
    }
}
