//! Document source collaborators: the loading contract plus bundled adapters.
//!
//! Sources yield ready-to-segment [`Document`]s and never surface decoding
//! problems as errors: a file that cannot be read as UTF-8 text is skipped
//! with a warning, matching the ingestion policy for non-text content.

pub mod fs;
pub mod github;

use async_trait::async_trait;

use crate::types::{Document, RetrievalError};

pub use fs::FsSource;
pub use github::GithubSource;

/// Filter applied while listing documents.
#[derive(Clone, Debug, Default)]
pub struct DocumentFilter {
    /// File extensions (with leading dot) to include; empty means every file.
    pub extensions: Vec<String>,
}

impl DocumentFilter {
    pub fn with_extensions(extensions: &[&str]) -> Self {
        Self {
            extensions: extensions.iter().map(|ext| ext.to_string()).collect(),
        }
    }

    /// The default mainframe + documentation extension set.
    pub fn legacy_defaults() -> Self {
        Self::with_extensions(&[".cbl", ".cpy", ".jcl", ".bms", ".dcl", ".txt", ".md"])
    }

    /// `true` when `path` passes the extension filter.
    pub fn matches(&self, path: &str) -> bool {
        self.extensions.is_empty()
            || self
                .extensions
                .iter()
                .any(|ext| path.to_ascii_lowercase().ends_with(ext.as_str()))
    }
}

/// Narrow contract the pipelines hold on any document source.
///
/// Implementations report failures as [`RetrievalError::Source`].
#[async_trait]
pub trait DocumentSource: Send + Sync {
    /// Lists and loads every document passing `filter`. Pull-based, finite,
    /// one-shot per ingestion run.
    async fn load_documents(&self, filter: &DocumentFilter)
    -> Result<Vec<Document>, RetrievalError>;

    /// Fetches the live contents of one file; `Ok(None)` when the file is
    /// missing or not decodable as text.
    async fn fetch_file_content(
        &self,
        repo_id: &str,
        path: &str,
    ) -> Result<Option<String>, RetrievalError>;
}
