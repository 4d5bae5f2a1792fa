//! PDF page iteration.
//!
//! Page access goes through [`PageSource`] so page selection and marker
//! formatting do not depend on a particular PDF parser.

use llamachat_core::ExtractionError;
use tracing::trace;

/// Something with numbered pages of text. Pages are numbered from 1.
pub trait PageSource {
    fn page_count(&self) -> usize;

    fn page_text(&self, page: u32) -> Result<String, String>;
}

impl PageSource for lopdf::Document {
    fn page_count(&self) -> usize {
        self.get_pages().len()
    }

    fn page_text(&self, page: u32) -> Result<String, String> {
        self.extract_text(&[page]).map_err(|e| e.to_string())
    }
}

/// Marker placed before the text of each page.
pub fn page_marker(page: u32) -> String {
    format!("--- Page {page} ---")
}

/// Concatenate page text in order, reading at most `max_pages` pages.
///
/// Returns the text and the number of pages read. Pages whose text is
/// blank are skipped together with their marker.
pub fn render_pages(
    source: &impl PageSource,
    file: &str,
    max_pages: Option<usize>,
) -> Result<(String, usize), ExtractionError> {
    let total = source.page_count();
    let limit = max_pages.map_or(total, |m| m.min(total));

    let mut out = String::new();
    for page in 1..=limit as u32 {
        let text = source
            .page_text(page)
            .map_err(|reason| ExtractionError::PageFailed {
                file: file.to_string(),
                page,
                reason,
            })?;

        let text = text.trim();
        if text.is_empty() {
            trace!(file, page, "Skipping page without a text layer");
            continue;
        }

        out.push_str(&page_marker(page));
        out.push('\n');
        out.push_str(text);
        out.push('\n');
    }

    Ok((out, limit))
}

/// Parse PDF bytes and render their pages.
pub fn extract_pdf(
    bytes: &[u8],
    file: &str,
    max_pages: Option<usize>,
) -> Result<(String, usize), ExtractionError> {
    let doc = lopdf::Document::load_mem(bytes).map_err(|e| ExtractionError::InvalidPdf {
        file: file.to_string(),
        reason: e.to_string(),
    })?;
    render_pages(&doc, file, max_pages)
}

#[cfg(test)]
pub(crate) mod test_pdf {
    use lopdf::content::{Content, Operation};
    use lopdf::{Document, Object, Stream, dictionary};

    /// Build a PDF with one page per entry; empty entries become blank pages.
    pub fn build(pages: &[&str]) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
            "Encoding" => "WinAnsiEncoding",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });

        let media_box: Vec<Object> = vec![0.into(), 0.into(), 612.into(), 792.into()];
        let mut kids: Vec<Object> = Vec::new();
        for text in pages {
            let operations = if text.is_empty() {
                Vec::new()
            } else {
                vec![
                    Operation::new("BT", vec![]),
                    Operation::new("Tf", vec!["F1".into(), 12.into()]),
                    Operation::new("Td", vec![72.into(), 720.into()]),
                    Operation::new("Tj", vec![Object::string_literal(*text)]),
                    Operation::new("ET", vec![]),
                ]
            };
            let content = Content { operations };
            let content_id =
                doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
                "Resources" => resources_id,
                "MediaBox" => media_box.clone(),
            });
            kids.push(page_id.into());
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut buf = Vec::new();
        doc.save_to(&mut buf).unwrap();
        buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakePages(Vec<Result<String, String>>);

    impl PageSource for FakePages {
        fn page_count(&self) -> usize {
            self.0.len()
        }

        fn page_text(&self, page: u32) -> Result<String, String> {
            self.0[page as usize - 1].clone()
        }
    }

    fn pages(n: usize) -> FakePages {
        FakePages((1..=n).map(|i| Ok(format!("text of page {i}"))).collect())
    }

    fn marker_pages(text: &str) -> Vec<u32> {
        text.lines()
            .filter_map(|l| l.strip_prefix("--- Page "))
            .filter_map(|l| l.strip_suffix(" ---"))
            .map(|n| n.parse().unwrap())
            .collect()
    }

    #[test]
    fn max_pages_limits_markers() {
        let (text, read) = render_pages(&pages(12), "big.pdf", Some(10)).unwrap();
        assert_eq!(read, 10);
        assert_eq!(marker_pages(&text), (1..=10).collect::<Vec<_>>());
        assert!(!text.contains("page 11"));
    }

    #[test]
    fn no_limit_reads_everything() {
        let (text, read) = render_pages(&pages(3), "small.pdf", None).unwrap();
        assert_eq!(read, 3);
        assert_eq!(marker_pages(&text), vec![1, 2, 3]);
    }

    #[test]
    fn limit_larger_than_document() {
        let (_, read) = render_pages(&pages(2), "small.pdf", Some(10)).unwrap();
        assert_eq!(read, 2);
    }

    #[test]
    fn blank_pages_are_skipped() {
        let source = FakePages(vec![
            Ok("first".into()),
            Ok("   \n".into()),
            Ok("third".into()),
        ]);
        let (text, read) = render_pages(&source, "scan.pdf", None).unwrap();
        assert_eq!(read, 3);
        assert_eq!(marker_pages(&text), vec![1, 3]);
        assert_eq!(text, "--- Page 1 ---\nfirst\n--- Page 3 ---\nthird\n");
    }

    #[test]
    fn page_failure_names_page() {
        let source = FakePages(vec![Ok("fine".into()), Err("corrupt stream".into())]);
        let err = render_pages(&source, "broken.pdf", None).unwrap_err();
        match err {
            ExtractionError::PageFailed { file, page, .. } => {
                assert_eq!(file, "broken.pdf");
                assert_eq!(page, 2);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn real_pdf_twelve_pages_capped_at_ten() {
        let texts: Vec<String> = (1..=12).map(|i| format!("Chapter {i}")).collect();
        let refs: Vec<&str> = texts.iter().map(String::as_str).collect();
        let bytes = test_pdf::build(&refs);

        let (text, read) = extract_pdf(&bytes, "book.pdf", Some(10)).unwrap();
        assert_eq!(read, 10);
        assert_eq!(marker_pages(&text), (1..=10).collect::<Vec<_>>());
        assert!(text.contains("Chapter 1"));
        assert!(!text.contains("Chapter 11"));
    }

    #[test]
    fn garbage_bytes_are_invalid_pdf() {
        let err = extract_pdf(b"definitely not a pdf", "fake.pdf", None).unwrap_err();
        assert!(matches!(err, ExtractionError::InvalidPdf { .. }));
    }
}
