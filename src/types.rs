//! Core domain types shared across the ingestion and query pipelines.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Errors surfaced by the pipelines and their collaborator adapters.
///
/// Collaborator failures keep their origin distinct so callers can report an
/// accurate cause: an embedding failure is never conflated with an index or
/// document-source failure. Local skips (boilerplate files, unmapped
/// extensions, undecodable content) are policy decisions, not errors, and do
/// not appear here.
#[derive(Debug, Error)]
pub enum RetrievalError {
    /// The query text was empty or whitespace-only.
    #[error("query text must not be empty")]
    EmptyQuery,

    /// The embedding collaborator failed.
    #[error("embedding request failed: {0}")]
    Embedding(String),

    /// The vector index collaborator failed.
    #[error("vector index operation failed: {0}")]
    Index(String),

    /// The document source collaborator failed.
    #[error("document source error: {0}")]
    Source(String),

    /// A document, endpoint, or payload could not be interpreted.
    #[error("invalid document: {0}")]
    InvalidDocument(String),

    /// Filesystem error while walking local corpora.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// A raw document as supplied by a document source.
///
/// Immutable once loaded; only the segmenter consumes it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Path of the file within its repository.
    pub path: String,
    /// Raw UTF-8 contents.
    pub text: String,
    /// Identifier of the repository the file came from (e.g. `owner/repo`).
    pub source_repo: String,
}

impl Document {
    pub fn new(
        path: impl Into<String>,
        text: impl Into<String>,
        source_repo: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            text: text.into(),
            source_repo: source_repo.into(),
        }
    }

    /// Final path component.
    pub fn file_name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }
}

/// Structural document types with a registered boundary rule.
///
/// The mainframe/legacy variants segment along source-structure markers
/// (paragraph labels, job steps, map definitions); `Text` and `Markdown`
/// segment along prose structure.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    Cobol,
    Copybook,
    Jcl,
    Declaration,
    BasicMappingSupport,
    Text,
    Markdown,
}

impl DocumentType {
    /// Maps a file extension (lowercase, without the dot) to its type.
    ///
    /// Returns `None` for extensions without a registered boundary rule;
    /// such files are excluded from segmentation.
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension {
            "cbl" => Some(Self::Cobol),
            "cpy" => Some(Self::Copybook),
            "jcl" => Some(Self::Jcl),
            "bms" => Some(Self::BasicMappingSupport),
            "dcl" => Some(Self::Declaration),
            "txt" => Some(Self::Text),
            "md" => Some(Self::Markdown),
            _ => None,
        }
    }

    /// `true` for mainframe/legacy source types; drives the artifact axis.
    pub fn is_legacy_source(self) -> bool {
        matches!(
            self,
            Self::Cobol | Self::Copybook | Self::Jcl | Self::Declaration | Self::BasicMappingSupport
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cobol => "cobol",
            Self::Copybook => "copybook",
            Self::Jcl => "jcl",
            Self::Declaration => "declaration",
            Self::BasicMappingSupport => "basic_mapping_support",
            Self::Text => "text",
            Self::Markdown => "markdown",
        }
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A bounded span of a document's text produced by structural segmentation.
///
/// `start_index..end_index` delimits the chunk's non-overlapping core span in
/// the original document, so cores taken in `chunk_index` order tile the
/// document exactly. `text` is the trimmed core, prefixed for every chunk
/// after the first with the previous raw fragment's trailing overlap plus a
/// single space.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub text: String,
    /// Byte offset of the core's start in the original document.
    pub start_index: usize,
    /// Byte offset one past the core's end in the original document.
    pub end_index: usize,
    /// 0-based position within the parent document.
    pub chunk_index: usize,
}

/// Role a file plays in its repository, derived from its path.
///
/// The role fixes the multiplicative importance weight applied to similarity
/// scores at query time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileRole {
    Readme,
    Doc,
    Code,
}

impl FileRole {
    /// Relevance weight attached at ingestion time.
    pub fn importance(self) -> f32 {
        match self {
            Self::Readme => 1.2,
            Self::Doc => 1.1,
            Self::Code => 1.0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Readme => "readme",
            Self::Doc => "doc",
            Self::Code => "code",
        }
    }
}

/// Coarse artifact axis used for downstream filtering, never for scoring.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    Code,
    Text,
}

impl ArtifactKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Code => "code",
            Self::Text => "text",
        }
    }
}

/// A chunk enriched with provenance and relevance metadata, ready to embed.
///
/// Immutable after creation; re-ingestion overwrites by deterministic id
/// rather than mutating in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnotatedChunk {
    pub chunk: Chunk,
    pub repo_id: String,
    pub path: String,
    pub file_name: String,
    pub file_type: FileRole,
    pub artifact_type: ArtifactKind,
    pub importance: f32,
}

impl AnnotatedChunk {
    /// Deterministic chunk identity; identical boundaries re-ingest to the
    /// same id, so upserts overwrite instead of duplicating.
    pub fn id(&self) -> String {
        chunk_id(&self.path, self.chunk.start_index)
    }

    /// Metadata payload stored alongside the vector.
    pub fn metadata(&self) -> serde_json::Value {
        serde_json::json!({
            "repo_id": self.repo_id,
            "path": self.path,
            "file_name": self.file_name,
            "file_type": self.file_type.as_str(),
            "artifact_type": self.artifact_type.as_str(),
            "importance": self.importance,
            "chunk_index": self.chunk.chunk_index,
            "start_index": self.chunk.start_index,
            "end_index": self.chunk.end_index,
        })
    }
}

/// Stable chunk id derived from `(path, start_index)` via a name-based UUID.
pub fn chunk_id(path: &str, start_index: usize) -> String {
    Uuid::new_v5(
        &Uuid::NAMESPACE_OID,
        format!("{path}:{start_index}").as_bytes(),
    )
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_ids_are_deterministic() {
        let a = chunk_id("src/main.cbl", 120);
        let b = chunk_id("src/main.cbl", 120);
        assert_eq!(a, b);
    }

    #[test]
    fn chunk_ids_distinguish_path_and_offset() {
        let base = chunk_id("src/main.cbl", 0);
        assert_ne!(base, chunk_id("src/main.cbl", 1));
        assert_ne!(base, chunk_id("src/other.cbl", 0));
    }

    #[test]
    fn extension_table_matches_registered_types() {
        assert_eq!(DocumentType::from_extension("cbl"), Some(DocumentType::Cobol));
        assert_eq!(DocumentType::from_extension("cpy"), Some(DocumentType::Copybook));
        assert_eq!(DocumentType::from_extension("jcl"), Some(DocumentType::Jcl));
        assert_eq!(
            DocumentType::from_extension("bms"),
            Some(DocumentType::BasicMappingSupport)
        );
        assert_eq!(
            DocumentType::from_extension("dcl"),
            Some(DocumentType::Declaration)
        );
        assert_eq!(DocumentType::from_extension("txt"), Some(DocumentType::Text));
        assert_eq!(DocumentType::from_extension("md"), Some(DocumentType::Markdown));
        assert_eq!(DocumentType::from_extension("exe"), None);
    }

    #[test]
    fn file_name_takes_last_component() {
        let doc = Document::new("docs/guides/setup.md", "", "acme/widgets");
        assert_eq!(doc.file_name(), "setup.md");
    }

    #[test]
    fn importance_follows_file_role() {
        assert_eq!(FileRole::Readme.importance(), 1.2);
        assert_eq!(FileRole::Doc.importance(), 1.1);
        assert_eq!(FileRole::Code.importance(), 1.0);
    }
}
