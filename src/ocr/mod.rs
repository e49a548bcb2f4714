//! OCR text extraction.
//!
//! Uses the Tesseract CLI as the OCR engine. Tesseract is invoked as a
//! subprocess on a temp copy of the document, bounded by a timeout, and
//! failures degrade to empty output so the parsing pipeline can carry on
//! with whatever it has.

mod tesseract;

pub use tesseract::TesseractOcr;
