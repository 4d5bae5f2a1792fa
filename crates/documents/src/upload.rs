//! Uploaded files and their recognised kinds.

use serde::{Deserialize, Serialize};
use std::path::Path;

pub const MIME_PDF: &str = "application/pdf";
pub const MIME_TEXT: &str = "text/plain";
pub const MIME_DOCX: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

/// A file as received at the upload boundary.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// Original file name, used as the document identifier
    pub name: String,
    /// Declared MIME type (may be empty)
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    pub fn new(name: impl Into<String>, mime: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            mime: mime.into(),
            bytes: bytes.into(),
        }
    }

    /// Read a file from disk, guessing its MIME type from the extension.
    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = std::fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let mime = DocumentKind::from_extension(&name).mime().to_string();
        Ok(Self { name, mime, bytes })
    }

    /// The kind used for extraction.
    ///
    /// The declared MIME type wins; the extension is only consulted when the
    /// type is missing or generic.
    pub fn kind(&self) -> DocumentKind {
        let mime = self.mime.trim();
        if mime.is_empty() || mime.eq_ignore_ascii_case("application/octet-stream") {
            DocumentKind::from_extension(&self.name)
        } else {
            DocumentKind::from_mime(mime)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    Pdf,
    PlainText,
    /// Treated as plain text
    WordProcessor,
    Unsupported,
}

impl DocumentKind {
    pub fn from_mime(mime: &str) -> Self {
        // Drop parameters such as "; charset=utf-8"
        let essence = mime.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
        match essence.as_str() {
            MIME_PDF => Self::Pdf,
            MIME_TEXT => Self::PlainText,
            MIME_DOCX => Self::WordProcessor,
            _ => Self::Unsupported,
        }
    }

    pub fn from_extension(name: &str) -> Self {
        let ext = Path::new(name)
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "pdf" => Self::Pdf,
            "txt" | "md" | "text" => Self::PlainText,
            "docx" => Self::WordProcessor,
            _ => Self::Unsupported,
        }
    }

    pub fn mime(&self) -> &'static str {
        match self {
            Self::Pdf => MIME_PDF,
            Self::PlainText => MIME_TEXT,
            Self::WordProcessor => MIME_DOCX,
            Self::Unsupported => "application/octet-stream",
        }
    }

    pub fn is_supported(&self) -> bool {
        !matches!(self, Self::Unsupported)
    }
}
