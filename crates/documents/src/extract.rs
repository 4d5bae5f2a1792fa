//! The extraction entry point.

use llamachat_core::{Document, ExtractionError};
use serde::Serialize;
use tracing::debug;

use crate::pdf;
use crate::upload::{DocumentKind, UploadedFile};

/// Result of running one file through the extractor.
#[derive(Debug, Clone, Serialize)]
pub struct Extraction {
    pub kind: DocumentKind,
    pub text: String,
    /// Pages read, for PDFs
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pages: Option<usize>,
}

impl Extraction {
    fn unsupported() -> Self {
        Self {
            kind: DocumentKind::Unsupported,
            text: String::new(),
            pages: None,
        }
    }

    /// No usable text: either an empty document or an unsupported type.
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }

    /// Turn the extraction into a context document, if it carries any text.
    pub fn into_document(self, id: impl Into<String>) -> Option<Document> {
        if self.is_empty() {
            return None;
        }
        let doc = Document::new(id, self.text);
        Some(match self.pages {
            Some(p) => doc.with_pages(p),
            None => doc,
        })
    }
}

/// Extract text from one file. Unsupported types yield empty text, not an error.
pub fn extract(file: &UploadedFile, max_pages: Option<usize>) -> Result<Extraction, ExtractionError> {
    let kind = file.kind();
    let extraction = match kind {
        DocumentKind::Pdf => {
            let (text, pages) = pdf::extract_pdf(&file.bytes, &file.name, max_pages)?;
            Extraction {
                kind,
                text,
                pages: Some(pages),
            }
        }
        DocumentKind::PlainText | DocumentKind::WordProcessor => Extraction {
            kind,
            text: decode_utf8(&file.bytes, &file.name)?,
            pages: None,
        },
        DocumentKind::Unsupported => {
            debug!(file = %file.name, mime = %file.mime, "Ignoring unsupported file type");
            Extraction::unsupported()
        }
    };

    debug!(
        file = %file.name,
        kind = ?extraction.kind,
        chars = extraction.text.chars().count(),
        pages = ?extraction.pages,
        "Extracted document text"
    );
    Ok(extraction)
}

fn decode_utf8(bytes: &[u8], file: &str) -> Result<String, ExtractionError> {
    let text = std::str::from_utf8(bytes).map_err(|e| ExtractionError::InvalidText {
        file: file.to_string(),
        reason: e.to_string(),
    })?;
    Ok(text.strip_prefix('\u{feff}').unwrap_or(text).to_string())
}

/// Extractor bound to a page limit.
#[derive(Debug, Clone, Copy, Default)]
pub struct Extractor {
    max_pages: Option<usize>,
}

impl Extractor {
    pub fn new(max_pages: Option<usize>) -> Self {
        Self { max_pages }
    }

    pub fn max_pages(&self) -> Option<usize> {
        self.max_pages
    }

    pub fn extract(&self, file: &UploadedFile) -> Result<Extraction, ExtractionError> {
        extract(file, self.max_pages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::test_pdf;
    use crate::upload::{MIME_DOCX, MIME_PDF, MIME_TEXT};

    #[test]
    fn plain_text_decodes_in_full() {
        let file = UploadedFile::new("notes.txt", MIME_TEXT, b"hello world".to_vec());
        let out = extract(&file, Some(1)).unwrap();
        assert_eq!(out.kind, DocumentKind::PlainText);
        assert_eq!(out.text, "hello world");
        assert_eq!(out.pages, None);
    }

    #[test]
    fn byte_order_mark_is_dropped() {
        let file = UploadedFile::new("bom.txt", MIME_TEXT, "\u{feff}abc".as_bytes().to_vec());
        assert_eq!(extract(&file, None).unwrap().text, "abc");
    }

    #[test]
    fn invalid_utf8_is_an_extraction_error() {
        let file = UploadedFile::new("bin.txt", MIME_TEXT, vec![0xff, 0xfe, 0x00, 0xc3]);
        let err = extract(&file, None).unwrap_err();
        assert!(matches!(err, ExtractionError::InvalidText { .. }));
        assert_eq!(err.file(), "bin.txt");
    }

    #[test]
    fn docx_archive_is_not_text() {
        // A real .docx is a zip archive; the local file header is not UTF-8.
        let header = vec![b'P', b'K', 3, 4, 0x14, 0x00, 0x06, 0x00, 0x08, 0x00, 0xa1, 0xbe];
        let file = UploadedFile::new("letter.docx", MIME_DOCX, header);
        assert!(extract(&file, None).is_err());
    }

    #[test]
    fn unsupported_type_is_empty_not_error() {
        let file = UploadedFile::new("photo.png", "image/png", vec![0x89, b'P', b'N', b'G']);
        let out = extract(&file, None).unwrap();
        assert_eq!(out.kind, DocumentKind::Unsupported);
        assert!(out.is_empty());
        assert!(out.into_document("photo.png").is_none());
    }

    #[test]
    fn empty_document_yields_no_context() {
        let file = UploadedFile::new("empty.txt", MIME_TEXT, Vec::new());
        let out = extract(&file, None).unwrap();
        assert_eq!(out.kind, DocumentKind::PlainText);
        assert!(out.into_document("empty.txt").is_none());
    }

    #[test]
    fn pdf_through_extractor() {
        let bytes = test_pdf::build(&["Intro", "", "Summary"]);
        let file = UploadedFile::new("paper.pdf", MIME_PDF, bytes);
        let extractor = Extractor::new(Some(10));

        let out = extractor.extract(&file).unwrap();
        assert_eq!(out.kind, DocumentKind::Pdf);
        assert_eq!(out.pages, Some(3));
        assert!(out.text.contains("--- Page 1 ---"));
        assert!(!out.text.contains("--- Page 2 ---"));
        assert!(out.text.contains("--- Page 3 ---"));

        let doc = out.into_document("paper.pdf").unwrap();
        assert_eq!(doc.pages, Some(3));
    }
}
