//! ```text
//! DocumentSource ──► IngestionPipeline ──► Segmenter ──► Annotator
//!                          │                                 │
//!                          │         annotated chunks        │
//!                          └────────────────┬────────────────┘
//!                                           ▼
//!                          EmbeddingProvider ──► VectorIndex (upsert)
//!
//! query text ──► QueryPipeline ──► EmbeddingProvider ──► VectorIndex (search)
//!                     │
//!                     └──► importance rescoring ──► ScoredResult list
//! ```
//!
//! # reposense
//!
//! Structural chunking and importance-weighted vector retrieval for
//! source-code and documentation corpora.
//!
//! Documents are segmented along type-specific structural boundaries (COBOL
//! paragraph labels, JCL job steps, BMS map definitions, blank lines,
//! markdown headings) with a configurable character overlap, annotated with
//! provenance and an importance weight derived from the file's role, then
//! embedded and upserted into a vector index under deterministic chunk ids.
//! At query time the index's raw similarity scores are rescaled by the
//! stored importance weight, rewarding documentation over raw code without
//! touching the underlying metric.
//!
//! External collaborators sit behind three async traits —
//! [`sources::DocumentSource`], [`embeddings::EmbeddingProvider`], and
//! [`stores::VectorIndex`] — each with bundled adapters (GitHub/filesystem
//! sources, HTTP/mock embedders, sqlite-vec/in-memory indexes).
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use reposense::embeddings::MockEmbeddingProvider;
//! use reposense::stores::MemoryVectorIndex;
//! use reposense::{Document, IngestionPipeline, QueryPipeline};
//!
//! # async fn run() -> Result<(), reposense::RetrievalError> {
//! let embedder = Arc::new(MockEmbeddingProvider::new());
//! let index = Arc::new(MemoryVectorIndex::new());
//!
//! let ingestion = IngestionPipeline::new(embedder.clone(), index.clone());
//! let documents = vec![Document::new(
//!     "README.md",
//!     "# Widgets\n\nA toolkit for widget enthusiasts.",
//!     "acme/widgets",
//! )];
//! let indexed = ingestion.ingest(&documents).await?;
//! assert!(indexed > 0);
//!
//! let query = QueryPipeline::new(embedder, index);
//! let outcome = query.retrieve("what are widgets?", 5).await?;
//! for result in &outcome.results {
//!     println!("{} {:.3}", result.id, result.score);
//! }
//! # Ok(())
//! # }
//! ```

pub mod annotator;
pub mod config;
pub mod embeddings;
pub mod ingestion;
pub mod query;
pub mod segmenter;
pub mod sources;
pub mod stores;
pub mod types;

pub use config::Settings;
pub use ingestion::{IngestionConfig, IngestionPipeline};
pub use query::{QueryPipeline, RetrievalOutcome, ScoredResult};
pub use types::{AnnotatedChunk, Chunk, Document, DocumentType, RetrievalError};
