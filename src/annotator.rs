//! Per-chunk metadata derivation.
//!
//! Annotation is a pure step between segmentation and embedding: it copies
//! provenance off the source document, derives the file's role from its path,
//! and fixes the importance weight that query-time rescoring will apply.

use crate::types::{AnnotatedChunk, ArtifactKind, Chunk, Document, DocumentType, FileRole};

/// Derives the role a file plays from its path.
///
/// `readme.md` (case-insensitive suffix) outranks other markdown, which
/// outranks everything else.
pub fn file_role(path: &str) -> FileRole {
    let lower = path.to_ascii_lowercase();
    if lower.ends_with("readme.md") {
        FileRole::Readme
    } else if lower.ends_with(".md") {
        FileRole::Doc
    } else {
        FileRole::Code
    }
}

/// Attaches provenance, role, and importance metadata to one chunk.
///
/// Deterministic: identical inputs always produce an identical record.
pub fn annotate(chunk: Chunk, document: &Document, doc_type: DocumentType) -> AnnotatedChunk {
    let role = file_role(&document.path);
    AnnotatedChunk {
        repo_id: document.source_repo.clone(),
        path: document.path.clone(),
        file_name: document.file_name().to_string(),
        file_type: role,
        artifact_type: if doc_type.is_legacy_source() {
            ArtifactKind::Code
        } else {
            ArtifactKind::Text
        },
        importance: role.importance(),
        chunk,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk() -> Chunk {
        Chunk {
            text: "body".to_string(),
            start_index: 0,
            end_index: 4,
            chunk_index: 0,
        }
    }

    #[test]
    fn readme_outranks_docs_and_code() {
        assert_eq!(file_role("README.md"), FileRole::Readme);
        assert_eq!(file_role("docs/ReadMe.MD"), FileRole::Readme);
        assert_eq!(file_role("docs/guide.md"), FileRole::Doc);
        assert_eq!(file_role("src/app/main.cbl"), FileRole::Code);
    }

    #[test]
    fn annotation_copies_provenance() {
        let document = Document::new("docs/guide.md", "body", "acme/widgets");
        let annotated = annotate(chunk(), &document, DocumentType::Markdown);
        assert_eq!(annotated.repo_id, "acme/widgets");
        assert_eq!(annotated.path, "docs/guide.md");
        assert_eq!(annotated.file_name, "guide.md");
        assert_eq!(annotated.file_type, FileRole::Doc);
        assert_eq!(annotated.importance, 1.1);
    }

    #[test]
    fn artifact_axis_follows_document_type() {
        let legacy = Document::new("src/main.cbl", "body", "acme/widgets");
        let annotated = annotate(chunk(), &legacy, DocumentType::Cobol);
        assert_eq!(annotated.artifact_type, ArtifactKind::Code);

        let prose = Document::new("notes.txt", "body", "acme/widgets");
        let annotated = annotate(chunk(), &prose, DocumentType::Text);
        assert_eq!(annotated.artifact_type, ArtifactKind::Text);
    }

    #[test]
    fn annotation_is_deterministic() {
        let document = Document::new("README.md", "body", "acme/widgets");
        let a = annotate(chunk(), &document, DocumentType::Markdown);
        let b = annotate(chunk(), &document, DocumentType::Markdown);
        assert_eq!(a.id(), b.id());
        assert_eq!(a.metadata(), b.metadata());
    }
}
