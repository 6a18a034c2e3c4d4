//! Query-time retrieval: embed, search, importance-weighted rescoring.
//!
//! The pipeline validates the query, asks the embedding collaborator for a
//! query vector, runs nearest-neighbor search, and rescales every raw score
//! by the importance weight fixed at ingestion time. Rescoring produces new
//! values and keeps the index's ranking order.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::embeddings::{EmbeddingProvider, EmbeddingRole};
use crate::sources::DocumentSource;
use crate::stores::{QueryMatch, VectorIndex};
use crate::types::RetrievalError;

/// A match with its importance-weighted score.
///
/// Constructed fresh per query; the collaborator's [`QueryMatch`] is never
/// mutated.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScoredResult {
    pub id: String,
    /// Raw similarity multiplied by the stored importance weight.
    pub score: f32,
    pub metadata: serde_json::Value,
    pub text: Option<String>,
}

/// Everything produced by one retrieval call.
#[derive(Clone, Debug)]
pub struct RetrievalOutcome {
    /// Matches in the order the index ranked them.
    pub results: Vec<ScoredResult>,
    /// Live contents of the top match's file, when enrichment succeeded.
    pub file_content: Option<String>,
}

/// Rescales a match's raw score by its stored importance weight.
///
/// Matches without an `importance` entry keep their raw score (weight 1.0).
pub fn rescore(matched: &QueryMatch) -> ScoredResult {
    let importance = matched
        .metadata
        .get("importance")
        .and_then(|value| value.as_f64())
        .unwrap_or(1.0) as f32;
    ScoredResult {
        id: matched.id.clone(),
        score: matched.score * importance,
        metadata: matched.metadata.clone(),
        text: matched.text.clone(),
    }
}

/// Runs retrieval rounds against injected collaborators.
pub struct QueryPipeline {
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn VectorIndex>,
    source: Option<Arc<dyn DocumentSource>>,
}

impl QueryPipeline {
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, index: Arc<dyn VectorIndex>) -> Self {
        Self {
            embedder,
            index,
            source: None,
        }
    }

    /// Enables best-effort top-hit file enrichment through `source`.
    #[must_use]
    pub fn with_source(mut self, source: Arc<dyn DocumentSource>) -> Self {
        self.source = Some(source);
        self
    }

    /// Executes one retrieval round.
    ///
    /// Rejects empty or whitespace-only queries before any collaborator is
    /// called. An index with no matches yields an empty (successful) result.
    pub async fn retrieve(
        &self,
        query: &str,
        top_k: usize,
    ) -> Result<RetrievalOutcome, RetrievalError> {
        if query.trim().is_empty() {
            return Err(RetrievalError::EmptyQuery);
        }

        let owned = query.to_string();
        let mut vectors = self
            .embedder
            .embed_batch(std::slice::from_ref(&owned), EmbeddingRole::Query)
            .await?;
        let query_vector = vectors
            .pop()
            .ok_or_else(|| RetrievalError::Embedding("provider returned no query vector".into()))?;

        let matches = self.index.query(&query_vector, top_k).await?;
        if matches.is_empty() {
            debug!(query, "no matches in index");
            return Ok(RetrievalOutcome {
                results: Vec::new(),
                file_content: None,
            });
        }

        // Importance weighting rescales scores without re-ranking.
        let results: Vec<ScoredResult> = matches.iter().map(rescore).collect();
        let file_content = self.enrich(results.first()).await;

        Ok(RetrievalOutcome {
            results,
            file_content,
        })
    }

    /// Best-effort fetch of the top match's live file contents. Failures are
    /// logged and suppressed; they never affect the retrieval result.
    async fn enrich(&self, top: Option<&ScoredResult>) -> Option<String> {
        let source = self.source.as_ref()?;
        let top = top?;
        let repo_id = top.metadata.get("repo_id").and_then(|value| value.as_str())?;
        let path = top.metadata.get("path").and_then(|value| value.as_str())?;

        match source.fetch_file_content(repo_id, path).await {
            Ok(Some(content)) => Some(content),
            Ok(None) => {
                warn!(repo_id, path, "top match file not found during enrichment");
                None
            }
            Err(err) => {
                warn!(repo_id, path, error = %err, "enrichment fetch failed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use serde_json::json;

    use super::*;
    use crate::sources::DocumentFilter;
    use crate::stores::VectorRecord;
    use crate::types::Document;

    /// Embedder that counts calls so tests can assert it was never reached.
    struct CountingEmbedder {
        calls: AtomicUsize,
    }

    impl CountingEmbedder {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl EmbeddingProvider for CountingEmbedder {
        fn dimensions(&self) -> usize {
            2
        }

        async fn embed_batch(
            &self,
            texts: &[String],
            _role: EmbeddingRole,
        ) -> Result<Vec<Vec<f32>>, RetrievalError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(texts.iter().map(|_| vec![1.0, 0.0]).collect())
        }
    }

    /// Index that returns a canned match list in a fixed order.
    struct FixedIndex {
        matches: Vec<QueryMatch>,
    }

    #[async_trait]
    impl VectorIndex for FixedIndex {
        async fn upsert(&self, _records: Vec<VectorRecord>) -> Result<(), RetrievalError> {
            Ok(())
        }

        async fn query(
            &self,
            _vector: &[f32],
            top_k: usize,
        ) -> Result<Vec<QueryMatch>, RetrievalError> {
            Ok(self.matches.iter().take(top_k).cloned().collect())
        }

        async fn count(&self) -> Result<usize, RetrievalError> {
            Ok(self.matches.len())
        }
    }

    /// Source whose fetches always fail, for enrichment suppression tests.
    struct FailingSource;

    #[async_trait]
    impl DocumentSource for FailingSource {
        async fn load_documents(
            &self,
            _filter: &DocumentFilter,
        ) -> Result<Vec<Document>, RetrievalError> {
            Err(RetrievalError::Source("offline".into()))
        }

        async fn fetch_file_content(
            &self,
            _repo_id: &str,
            _path: &str,
        ) -> Result<Option<String>, RetrievalError> {
            Err(RetrievalError::Source("offline".into()))
        }
    }

    fn matched(id: &str, score: f32, metadata: serde_json::Value) -> QueryMatch {
        QueryMatch {
            id: id.to_string(),
            score,
            metadata,
            text: Some(format!("text for {id}")),
        }
    }

    #[tokio::test]
    async fn empty_query_is_rejected_before_any_collaborator_call() {
        let embedder = Arc::new(CountingEmbedder::new());
        let pipeline = QueryPipeline::new(embedder.clone(), Arc::new(FixedIndex { matches: vec![] }));

        for query in ["", "   ", "\n\t"] {
            let err = pipeline.retrieve(query, 5).await.unwrap_err();
            assert!(matches!(err, RetrievalError::EmptyQuery));
        }
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn importance_multiplies_the_raw_score() {
        let index = FixedIndex {
            matches: vec![
                matched("readme", 0.5, json!({ "importance": 1.2 })),
                matched("code", 0.8, json!({})),
            ],
        };
        let pipeline = QueryPipeline::new(Arc::new(CountingEmbedder::new()), Arc::new(index));

        let outcome = pipeline.retrieve("query", 5).await.unwrap();
        assert!((outcome.results[0].score - 0.6).abs() < 1e-6);
        assert!((outcome.results[1].score - 0.8).abs() < 1e-6);
    }

    #[tokio::test]
    async fn index_order_is_preserved_after_rescoring() {
        // After weighting, "second" outscores "first"; the order must still
        // be the index's own ranking.
        let index = FixedIndex {
            matches: vec![
                matched("first", 0.50, json!({ "importance": 1.0 })),
                matched("second", 0.49, json!({ "importance": 1.2 })),
            ],
        };
        let pipeline = QueryPipeline::new(Arc::new(CountingEmbedder::new()), Arc::new(index));

        let outcome = pipeline.retrieve("query", 5).await.unwrap();
        let ids: Vec<&str> = outcome.results.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["first", "second"]);
        assert!(outcome.results[1].score > outcome.results[0].score);
    }

    #[tokio::test]
    async fn no_matches_is_a_valid_empty_result() {
        let pipeline = QueryPipeline::new(
            Arc::new(CountingEmbedder::new()),
            Arc::new(FixedIndex { matches: vec![] }),
        );
        let outcome = pipeline.retrieve("query", 5).await.unwrap();
        assert!(outcome.results.is_empty());
        assert!(outcome.file_content.is_none());
    }

    #[tokio::test]
    async fn enrichment_failure_never_fails_the_query() {
        let index = FixedIndex {
            matches: vec![matched(
                "top",
                0.9,
                json!({ "repo_id": "acme/widgets", "path": "README.md" }),
            )],
        };
        let pipeline = QueryPipeline::new(Arc::new(CountingEmbedder::new()), Arc::new(index))
            .with_source(Arc::new(FailingSource));

        let outcome = pipeline.retrieve("query", 5).await.unwrap();
        assert_eq!(outcome.results.len(), 1);
        assert!(outcome.file_content.is_none());
    }

    #[tokio::test]
    async fn enrichment_skipped_when_metadata_is_incomplete() {
        let index = FixedIndex {
            matches: vec![matched("top", 0.9, json!({ "path": "README.md" }))],
        };
        let pipeline = QueryPipeline::new(Arc::new(CountingEmbedder::new()), Arc::new(index))
            .with_source(Arc::new(FailingSource));

        let outcome = pipeline.retrieve("query", 5).await.unwrap();
        assert!(outcome.file_content.is_none());
    }

    #[test]
    fn rescore_does_not_mutate_the_match() {
        let original = matched("a", 0.5, json!({ "importance": 1.2 }));
        let result = rescore(&original);
        assert!((result.score - 0.6).abs() < 1e-6);
        assert!((original.score - 0.5).abs() < 1e-6);
    }
}
