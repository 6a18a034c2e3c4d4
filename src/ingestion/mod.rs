//! Batch ingestion: filter, segment, annotate, embed, upsert.
//!
//! ```text
//! documents ──► boilerplate filter ──► extension→type table
//!                                            │
//!                                            ▼
//!                                 Segmenter ──► Annotator
//!                                            │
//!                                            ▼
//!                    sub-batches ──► EmbeddingProvider ──► VectorIndex
//! ```
//!
//! Sub-batching bounds request size only; it never changes chunk identity or
//! ordering, and the union of all sub-batch upserts equals the full batch.

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info};

use crate::annotator::annotate;
use crate::embeddings::{EmbeddingProvider, EmbeddingRole};
use crate::segmenter::{self, DEFAULT_OVERLAP};
use crate::sources::{DocumentFilter, DocumentSource};
use crate::stores::{VectorIndex, VectorRecord};
use crate::types::{AnnotatedChunk, Document, DocumentType, RetrievalError};

/// Chunks embedded and upserted per collaborator request.
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Path substrings (lowercase) that mark non-informative boilerplate.
pub const DEFAULT_SKIP_KEYWORDS: &[&str] = &["code_of_conduct", "contributing", "license"];

/// Tuning knobs for an ingestion run.
#[derive(Clone, Debug)]
pub struct IngestionConfig {
    /// Characters of the previous fragment carried into each chunk.
    pub overlap: usize,
    /// Upper bound on chunks per embed+upsert request.
    pub batch_size: usize,
    /// Case-insensitive path substrings that exclude boilerplate files.
    pub skip_keywords: Vec<String>,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            overlap: DEFAULT_OVERLAP,
            batch_size: DEFAULT_BATCH_SIZE,
            skip_keywords: DEFAULT_SKIP_KEYWORDS
                .iter()
                .map(|keyword| keyword.to_string())
                .collect(),
        }
    }
}

/// Drives documents through segmentation and annotation, then hands the
/// annotated chunks to the embedding and index collaborators.
///
/// Ingestion is idempotent: re-running over the same document set with the
/// same segmentation parameters overwrites existing vectors at matching ids
/// and never creates duplicates.
pub struct IngestionPipeline {
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn VectorIndex>,
    config: IngestionConfig,
}

impl IngestionPipeline {
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, index: Arc<dyn VectorIndex>) -> Self {
        Self::with_config(embedder, index, IngestionConfig::default())
    }

    pub fn with_config(
        embedder: Arc<dyn EmbeddingProvider>,
        index: Arc<dyn VectorIndex>,
        config: IngestionConfig,
    ) -> Self {
        Self {
            embedder,
            index,
            config,
        }
    }

    /// `true` when a path names boilerplate that should stay out of the
    /// index.
    fn is_boilerplate(&self, path: &str) -> bool {
        let lower = path.to_ascii_lowercase();
        self.config
            .skip_keywords
            .iter()
            .any(|keyword| lower.contains(keyword.as_str()))
    }

    /// Segments and annotates a batch without touching collaborators.
    pub fn prepare(&self, documents: &[Document]) -> Vec<AnnotatedChunk> {
        let mut annotated = Vec::new();
        for document in documents {
            if self.is_boilerplate(&document.path) {
                debug!(path = %document.path, "skipping boilerplate file");
                continue;
            }
            let Some(doc_type) = document_type_for_path(&document.path) else {
                debug!(path = %document.path, "skipping file without a registered document type");
                continue;
            };
            for chunk in segmenter::segment_with_overlap(document, doc_type, self.config.overlap) {
                annotated.push(annotate(chunk, document, doc_type));
            }
        }
        annotated
    }

    /// Ingests a batch of documents; returns the number of chunks indexed.
    ///
    /// An empty filtered batch is a successful no-op. Collaborator failures
    /// abort the run; chunks upserted by earlier sub-batches stay committed.
    pub async fn ingest(&self, documents: &[Document]) -> Result<usize, RetrievalError> {
        let annotated = self.prepare(documents);
        if annotated.is_empty() {
            info!("nothing to index after filtering and segmentation");
            return Ok(0);
        }

        let mut indexed = 0usize;
        for batch in annotated.chunks(self.config.batch_size) {
            let texts: Vec<String> = batch
                .iter()
                .map(|annotated| annotated.chunk.text.clone())
                .collect();
            let vectors = self
                .embedder
                .embed_batch(&texts, EmbeddingRole::Passage)
                .await?;
            if vectors.len() != batch.len() {
                return Err(RetrievalError::Embedding(format!(
                    "provider returned {} vectors for {} chunks",
                    vectors.len(),
                    batch.len()
                )));
            }

            let records: Vec<VectorRecord> = batch
                .iter()
                .zip(vectors)
                .map(|(annotated, embedding)| VectorRecord {
                    id: annotated.id(),
                    embedding,
                    metadata: annotated.metadata(),
                    text: annotated.chunk.text.clone(),
                })
                .collect();
            self.index.upsert(records).await?;

            indexed += batch.len();
            info!(batch = batch.len(), total = indexed, "upserted chunk batch");
        }
        Ok(indexed)
    }

    /// Loads documents from `source` and ingests them in one pass.
    pub async fn ingest_source(
        &self,
        source: &dyn DocumentSource,
        filter: &DocumentFilter,
    ) -> Result<usize, RetrievalError> {
        let documents = source.load_documents(filter).await?;
        self.ingest(&documents).await
    }
}

/// Document type for a path, via the fixed extension→type table.
pub fn document_type_for_path(path: &str) -> Option<DocumentType> {
    let extension = Path::new(path).extension()?.to_str()?;
    DocumentType::from_extension(&extension.to_ascii_lowercase())
}
