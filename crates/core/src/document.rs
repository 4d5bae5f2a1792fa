//! Extracted documents and the per-session context store.

use serde::{Deserialize, Serialize};

/// Text extracted from one uploaded file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// File name; unique within a session
    pub id: String,

    /// The extracted text
    pub text: String,

    /// Number of PDF pages read, if the source was a PDF
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pages: Option<usize>,
}

impl Document {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            pages: None,
        }
    }

    pub fn with_pages(mut self, pages: usize) -> Self {
        self.pages = Some(pages);
        self
    }

    /// Length in characters (not bytes).
    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }
}

/// Identifier → document map that remembers insertion order.
///
/// Re-inserting an existing identifier replaces the text but keeps the
/// original position, so selection of the "first N documents" stays stable
/// when a file is uploaded again.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContextStore {
    documents: Vec<Document>,
}

impl ContextStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite a document. Returns `true` if it replaced one.
    pub fn insert(&mut self, document: Document) -> bool {
        match self.documents.iter_mut().find(|d| d.id == document.id) {
            Some(existing) => {
                *existing = document;
                true
            }
            None => {
                self.documents.push(document);
                false
            }
        }
    }

    pub fn get(&self, id: &str) -> Option<&Document> {
        self.documents.iter().find(|d| d.id == id)
    }

    /// Documents in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Document> {
        self.documents.iter()
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn clear(&mut self) {
        self.documents.clear();
    }

    /// Sum of all document lengths in characters.
    pub fn total_chars(&self) -> usize {
        self.documents.iter().map(Document::char_count).sum()
    }
}
