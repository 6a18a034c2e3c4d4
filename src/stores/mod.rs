//! Vector index backends and the record types they exchange.
//!
//! ```text
//!                  ┌──────────────────┐
//!                  │ VectorIndex trait│
//!                  │ (async upsert /  │
//!                  │  query / count)  │
//!                  └────────┬─────────┘
//!                           │
//!               ┌───────────┴───────────┐
//!               ▼                       ▼
//!      ┌─────────────────┐    ┌──────────────────┐
//!      │ MemoryVectorIndex│   │ SqliteVectorIndex│
//!      │ (exact scan)     │   │ (sqlite-vec)     │
//!      └─────────────────┘    └──────────────────┘
//! ```
//!
//! Every backend adapter normalizes its results into [`QueryMatch`], so the
//! pipelines never branch on a backend's native response shape.

pub mod memory;
pub mod sqlite;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::types::RetrievalError;

pub use memory::MemoryVectorIndex;
pub use sqlite::SqliteVectorIndex;

/// A vector plus its metadata, keyed by a deterministic id and ready for
/// upsert.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VectorRecord {
    pub id: String,
    pub embedding: Vec<f32>,
    /// Metadata payload as JSON (provenance, role, importance, offsets).
    pub metadata: serde_json::Value,
    /// Chunk text, stored so matches can surface it.
    pub text: String,
}

/// A ranked match as returned by a vector index.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct QueryMatch {
    pub id: String,
    /// Raw similarity score; higher is better.
    pub score: f32,
    pub metadata: serde_json::Value,
    pub text: Option<String>,
}

/// Narrow contract the pipelines hold on any vector index.
///
/// Implementations report failures as [`RetrievalError::Index`] so callers
/// can distinguish index trouble from embedding trouble.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Inserts or overwrites records by id. Atomic per record: re-upserting
    /// an existing id replaces it and never duplicates.
    async fn upsert(&self, records: Vec<VectorRecord>) -> Result<(), RetrievalError>;

    /// Nearest-neighbor search, most similar first. An empty result is a
    /// valid answer, not an error.
    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<QueryMatch>, RetrievalError>;

    /// Number of records currently stored.
    async fn count(&self) -> Result<usize, RetrievalError>;
}
