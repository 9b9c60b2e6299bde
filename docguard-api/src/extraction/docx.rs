use docx_rs::{read_docx, DocumentChild, Paragraph, ParagraphChild, RunChild};

use super::ExtractionError;

/// Body paragraphs of a DOCX, one per line; blank paragraphs are skipped
pub(super) fn extract_text(bytes: &[u8]) -> Result<String, ExtractionError> {
    let docx = read_docx(bytes).map_err(|e| ExtractionError::Docx(format!("{:?}", e)))?;

    let paragraphs: Vec<String> = docx
        .document
        .children
        .iter()
        .filter_map(|child| match child {
            DocumentChild::Paragraph(paragraph) => Some(paragraph_text(paragraph)),
            _ => None,
        })
        .filter(|text| !text.trim().is_empty())
        .collect();

    Ok(paragraphs.join("\n"))
}

/// Runs of one paragraph, concatenated
fn paragraph_text(paragraph: &Paragraph) -> String {
    let mut text = String::new();
    for child in &paragraph.children {
        if let ParagraphChild::Run(run) = child {
            for run_child in &run.children {
                if let RunChild::Text(t) = run_child {
                    text.push_str(&t.text);
                }
            }
        }
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use docx_rs::{Docx, Run};
    use std::io::{Cursor, Read, Write};
    use zip::write::SimpleFileOptions;
    use zip::{ZipArchive, ZipWriter};

    fn build_docx(paragraphs: &[&[&str]]) -> Vec<u8> {
        let mut docx = Docx::new();
        for runs in paragraphs {
            let mut paragraph = Paragraph::new();
            for run in *runs {
                paragraph = paragraph.add_run(Run::new().add_text(*run));
            }
            docx = docx.add_paragraph(paragraph);
        }
        let mut buf = Cursor::new(Vec::new());
        docx.build().pack(&mut buf).unwrap();
        buf.into_inner()
    }

    /// Re-pack `docx` with `marker` in word/document.xml replaced by raw XML
    fn splice_document_xml(docx: &[u8], marker: &str, raw: &str) -> Vec<u8> {
        let mut archive = ZipArchive::new(Cursor::new(docx)).unwrap();
        let mut out = Cursor::new(Vec::new());
        {
            let mut writer = ZipWriter::new(&mut out);
            for i in 0..archive.len() {
                let mut entry = archive.by_index(i).unwrap();
                let name = entry.name().to_string();
                let mut contents = Vec::new();
                entry.read_to_end(&mut contents).unwrap();
                if name == "word/document.xml" {
                    contents = String::from_utf8(contents)
                        .unwrap()
                        .replace(marker, raw)
                        .into_bytes();
                }
                writer.start_file(name, SimpleFileOptions::default()).unwrap();
                writer.write_all(&contents).unwrap();
            }
            writer.finish().unwrap();
        }
        out.into_inner()
    }

    #[test]
    fn paragraphs_become_lines() {
        let bytes = build_docx(&[&["Internal use ", "only"], &["R&D plan"], &[]]);
        assert_eq!(extract_text(&bytes).unwrap(), "Internal use only\nR&D plan");
    }

    #[test]
    fn character_references_are_decoded() {
        let bytes = build_docx(&[&["MARKER"]]);
        let bytes = splice_document_xml(
            &bytes,
            "MARKER",
            "Don&#8217;t share &#x2014; SSN 123&#45;45&#45;6789 &amp; more",
        );
        assert_eq!(
            extract_text(&bytes).unwrap(),
            "Don\u{2019}t share \u{2014} SSN 123-45-6789 & more"
        );
    }

    #[test]
    fn non_docx_is_rejected() {
        assert!(matches!(extract_text(b"plain"), Err(ExtractionError::Docx(_))));
    }
}
