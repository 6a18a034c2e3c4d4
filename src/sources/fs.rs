//! Filesystem-backed document source for local corpora.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tracing::{debug, warn};

use super::{DocumentFilter, DocumentSource};
use crate::types::{Document, RetrievalError};

/// Walks a local directory tree and yields matching files as documents.
///
/// Paths are reported relative to the root, with `/` separators, so chunk
/// ids stay stable across platforms.
pub struct FsSource {
    root: PathBuf,
    repo_id: String,
}

impl FsSource {
    pub fn new(root: impl Into<PathBuf>, repo_id: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            repo_id: repo_id.into(),
        }
    }

    async fn collect_files(&self) -> Result<Vec<PathBuf>, RetrievalError> {
        let mut pending = vec![self.root.clone()];
        let mut files = Vec::new();
        while let Some(dir) = pending.pop() {
            let mut entries = fs::read_dir(&dir).await?;
            while let Some(entry) = entries.next_entry().await? {
                let file_type = entry.file_type().await?;
                if file_type.is_dir() {
                    pending.push(entry.path());
                } else if file_type.is_file() {
                    files.push(entry.path());
                }
            }
        }
        files.sort();
        Ok(files)
    }

    fn relative_path(&self, path: &Path) -> String {
        path.strip_prefix(&self.root)
            .unwrap_or(path)
            .to_string_lossy()
            .replace('\\', "/")
    }
}

#[async_trait]
impl DocumentSource for FsSource {
    async fn load_documents(
        &self,
        filter: &DocumentFilter,
    ) -> Result<Vec<Document>, RetrievalError> {
        let mut documents = Vec::new();
        for path in self.collect_files().await? {
            let relative = self.relative_path(&path);
            if !filter.matches(&relative) {
                continue;
            }
            match fs::read(&path).await {
                Ok(bytes) => match String::from_utf8(bytes) {
                    Ok(text) => documents.push(Document::new(relative, text, self.repo_id.clone())),
                    Err(_) => warn!(path = %relative, "skipping file that does not decode as UTF-8"),
                },
                Err(err) => warn!(path = %relative, error = %err, "skipping unreadable file"),
            }
        }
        debug!(root = %self.root.display(), count = documents.len(), "loaded documents");
        Ok(documents)
    }

    async fn fetch_file_content(
        &self,
        _repo_id: &str,
        path: &str,
    ) -> Result<Option<String>, RetrievalError> {
        match fs::read(self.root.join(path)).await {
            Ok(bytes) => Ok(String::from_utf8(bytes).ok()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn walks_nested_directories_with_filter() {
        let dir = tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("docs")).unwrap();
        std::fs::write(dir.path().join("README.md"), "# Hello").unwrap();
        std::fs::write(dir.path().join("docs/notes.txt"), "notes").unwrap();
        std::fs::write(dir.path().join("docs/image.png"), [0u8, 159, 146, 150]).unwrap();

        let source = FsSource::new(dir.path(), "local/corpus");
        let filter = DocumentFilter::with_extensions(&[".md", ".txt"]);
        let documents = source.load_documents(&filter).await.unwrap();

        let paths: Vec<&str> = documents.iter().map(|d| d.path.as_str()).collect();
        assert_eq!(paths, vec!["README.md", "docs/notes.txt"]);
        assert_eq!(documents[0].source_repo, "local/corpus");
    }

    #[tokio::test]
    async fn undecodable_file_is_skipped() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("binary.txt"), [0xffu8, 0xfe, 0x00]).unwrap();
        std::fs::write(dir.path().join("plain.txt"), "plain text").unwrap();

        let source = FsSource::new(dir.path(), "local/corpus");
        let documents = source
            .load_documents(&DocumentFilter::with_extensions(&[".txt"]))
            .await
            .unwrap();

        assert_eq!(documents.len(), 1);
        assert_eq!(documents[0].path, "plain.txt");
    }

    #[tokio::test]
    async fn fetch_missing_file_returns_none() {
        let dir = tempdir().unwrap();
        let source = FsSource::new(dir.path(), "local/corpus");
        let content = source
            .fetch_file_content("local/corpus", "nope.md")
            .await
            .unwrap();
        assert!(content.is_none());
    }

    #[tokio::test]
    async fn fetch_returns_live_contents() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("guide.md"), "# Guide").unwrap();

        let source = FsSource::new(dir.path(), "local/corpus");
        let content = source
            .fetch_file_content("local/corpus", "guide.md")
            .await
            .unwrap();
        assert_eq!(content.as_deref(), Some("# Guide"));
    }
}
