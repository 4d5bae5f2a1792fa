//! Document text extraction for LlamaChat.
//!
//! Turns uploaded files into plain text that the context assembler can put
//! in front of the model:
//!
//! | Declared type | Handling |
//! |---------------|----------|
//! | `application/pdf` | page text via `lopdf`, each page prefixed `--- Page N ---` |
//! | `text/plain` | UTF-8 decode |
//! | word-processor (`.docx`) | UTF-8 decode (approximation, no structural parsing) |
//! | anything else | empty text, not an error |
//!
//! Scanned pages are not OCR'd; a page without a text layer is skipped.

pub mod extract;
pub mod pdf;
pub mod upload;

pub use extract::{Extraction, Extractor, extract};
pub use pdf::PageSource;
pub use upload::{DocumentKind, UploadedFile};
