//! Text and image extraction from uploaded documents
//!
//! Dispatches on the file extension: PDF pages and embedded JPEGs, the body
//! text of a DOCX, or anything else read as lossy UTF-8 text.

mod docx;
mod pdf;

use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

use crate::models::ExtractedDocument;

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("PDF parsing failed: {0}")]
    Pdf(String),

    #[error("DOCX parsing failed: {0}")]
    Docx(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Extract pages, images and a legibility score from a document
pub fn extract_document(path: &Path, bytes: &[u8]) -> Result<ExtractedDocument, ExtractionError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    let (pages, images) = match ext.as_str() {
        "pdf" => (pdf::extract_pages(bytes)?, pdf::extract_images(bytes)),
        "docx" => (single_page(docx::extract_text(bytes)?), Vec::new()),
        _ => (single_page(String::from_utf8_lossy(bytes).into_owned()), Vec::new()),
    };

    let legibility_score = legibility_score(&pages);
    tracing::debug!(
        path = %path.display(),
        pages = pages.len(),
        images = images.len(),
        legibility = ?legibility_score,
        "Extracted document"
    );

    Ok(ExtractedDocument {
        pages,
        images,
        legibility_score,
    })
}

fn single_page(text: String) -> BTreeMap<u32, String> {
    BTreeMap::from([(1, text)])
}

/// Share of printable characters across all pages
///
/// Printable means alphanumeric, ASCII punctuation or whitespace. Returns
/// None when the document has no characters at all.
pub fn legibility_score(pages: &BTreeMap<u32, String>) -> Option<f64> {
    let mut total = 0usize;
    let mut printable = 0usize;
    for c in pages.values().flat_map(|text| text.chars()) {
        total += 1;
        if c.is_alphanumeric() || c.is_ascii_punctuation() || c.is_whitespace() {
            printable += 1;
        }
    }
    if total == 0 {
        return None;
    }
    Some(printable as f64 / total as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_one_page() {
        let doc = extract_document(Path::new("notes.TXT"), b"hello world").unwrap();
        assert_eq!(doc.page_count(), 1);
        assert_eq!(doc.pages[&1], "hello world");
        assert_eq!(doc.image_count(), 0);
        assert_eq!(doc.legibility_score, Some(1.0));
        assert!(doc.has_content());
    }

    #[test]
    fn unknown_extension_reads_lossy_utf8() {
        let doc = extract_document(Path::new("blob.bin"), &[b'o', b'k', 0xff, 0xfe]).unwrap();
        assert!(doc.pages[&1].starts_with("ok"));
        let score = doc.legibility_score.unwrap();
        assert!(score < 1.0 && score > 0.0);
    }

    #[test]
    fn blank_text_has_no_content() {
        let doc = extract_document(Path::new("empty.txt"), b"   \n\t ").unwrap();
        assert!(!doc.has_content());

        let doc = extract_document(Path::new("empty.txt"), b"").unwrap();
        assert_eq!(doc.legibility_score, None);
    }

    #[test]
    fn legibility_counts_control_characters() {
        let pages = BTreeMap::from([(1, "ab\u{0}\u{1}".to_string())]);
        assert_eq!(legibility_score(&pages), Some(0.5));
    }

    #[test]
    fn corrupt_pdf_is_an_error() {
        let result = extract_document(Path::new("broken.pdf"), b"not a pdf at all");
        assert!(matches!(result, Err(ExtractionError::Pdf(_))));
    }
}
