//! Document content provider boundary.
//!
//! The extractor consumes raw document content; where that content lives is
//! a collaborator concern. [`FileDocumentProvider`] is the minimal local
//! implementation: document id = path relative to a root directory.

use crate::StoreError;
use std::fs;
use std::path::PathBuf;

/// Raw content handed to the extractor: plain text, or bytes with a
/// declared MIME type for multimodal completion.
#[derive(Debug, Clone, PartialEq)]
pub enum DocumentContent {
    Text(String),
    File { bytes: Vec<u8>, mime: String },
}

impl DocumentContent {
    pub fn is_text(&self) -> bool {
        matches!(self, DocumentContent::Text(_))
    }
}

/// Returns raw text or binary + MIME type for a given item id.
pub trait DocumentProvider: Send + Sync {
    fn fetch(&self, id: &str) -> Result<DocumentContent, StoreError>;
}

/// Reads documents from a directory. Known text extensions come back as
/// `Text`; everything else as `File` with a guessed MIME type.
pub struct FileDocumentProvider {
    root: PathBuf,
}

impl FileDocumentProvider {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn mime_for(path: &std::path::Path) -> &'static str {
        match path.extension().and_then(|e| e.to_str()) {
            Some("pdf") => "application/pdf",
            Some("png") => "image/png",
            Some("jpg") | Some("jpeg") => "image/jpeg",
            _ => "application/octet-stream",
        }
    }
}

impl DocumentProvider for FileDocumentProvider {
    fn fetch(&self, id: &str) -> Result<DocumentContent, StoreError> {
        if id.contains("..") || id.starts_with('/') {
            return Err(StoreError::InvalidId(id.to_string()));
        }
        let path = self.root.join(id);
        if !path.exists() {
            return Err(StoreError::NotFound(id.to_string()));
        }
        let is_text = matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("txt") | Some("md") | Some("markdown") | None
        );
        if is_text {
            Ok(DocumentContent::Text(fs::read_to_string(&path)?))
        } else {
            Ok(DocumentContent::File {
                bytes: fs::read(&path)?,
                mime: Self::mime_for(&path).to_string(),
            })
        }
    }
}
