//! Document loading
//!
//! Stages never touch the artifact directly; they go through a
//! [`DocumentSource`], which opens the file read-only.

use crate::pipeline::StageError;
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::debug;

/// Extracted text of a document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentText {
    /// Per-page text with blank lines collapsed
    pub pages: Vec<String>,
    /// Pages joined by newlines
    pub full_text: String,
}

impl DocumentText {
    pub fn from_pages(pages: Vec<String>) -> Self {
        let pages: Vec<String> = pages.into_iter().map(|p| collapse_blank_lines(&p)).collect();
        let full_text = pages.join("\n");
        Self { pages, full_text }
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn char_count(&self) -> usize {
        self.full_text.chars().count()
    }
}

fn collapse_blank_lines(text: &str) -> String {
    text.replace("\n\n", "\n")
}

/// Read-only access to uploaded documents
#[async_trait]
pub trait DocumentSource: Send + Sync {
    async fn load(&self, path: &Path) -> Result<DocumentText, StageError>;
}

/// Extracted text shared by the stages of one run
///
/// The first stage to ask loads the document; later stages reuse the text.
#[derive(Debug, Default)]
pub struct DocumentCache {
    text: OnceCell<Arc<DocumentText>>,
}

impl DocumentCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get_or_load(
        &self,
        source: &dyn DocumentSource,
        path: &Path,
    ) -> Result<Arc<DocumentText>, StageError> {
        self.text
            .get_or_try_init(|| async { source.load(path).await.map(Arc::new) })
            .await
            .cloned()
    }

    pub fn is_loaded(&self) -> bool {
        self.text.initialized()
    }
}

/// PDF text-layer extraction via `pdf-extract`
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfDocumentSource;

#[async_trait]
impl DocumentSource for PdfDocumentSource {
    async fn load(&self, path: &Path) -> Result<DocumentText, StageError> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| StageError::Document(format!("{}: {}", path.display(), e)))?;

        debug!(path = %path.display(), bytes = bytes.len(), "Extracting PDF text");

        // Extraction is CPU-bound and may panic on hostile input
        let pages = tokio::task::spawn_blocking(move || {
            pdf_extract::extract_text_from_mem_by_pages(&bytes)
                .map_err(|e| StageError::Document(e.to_string()))
        })
        .await
        .map_err(|e| StageError::Document(format!("PDF extraction aborted: {}", e)))??;

        Ok(DocumentText::from_pages(pages))
    }
}
