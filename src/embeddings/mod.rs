//! Embedding collaborators: the provider contract plus bundled adapters.
//!
//! The pipelines hold an injected [`EmbeddingProvider`] handle; nothing in
//! the core ever constructs a model or client on its own. Providers report
//! failures as [`RetrievalError::Embedding`] so callers can tell embedding
//! trouble apart from index trouble.

use std::sync::OnceLock;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::types::RetrievalError;

/// Whether a batch is embedded for querying or for passage storage.
///
/// Instruction-tuned retrieval models encode the two sides differently, so
/// the role travels with every embedding request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EmbeddingRole {
    Query,
    Passage,
}

/// Narrow contract the pipelines hold on any embedding backend.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Vector width produced by this provider.
    fn dimensions(&self) -> usize;

    /// Embeds `texts` in order; the output holds exactly one vector per
    /// input, at matching positions.
    async fn embed_batch(
        &self,
        texts: &[String],
        role: EmbeddingRole,
    ) -> Result<Vec<Vec<f32>>, RetrievalError>;
}

/// Deterministic embedding provider for tests and demos.
///
/// Vectors are derived from a hash of the input text: identical inputs embed
/// identically, different inputs almost surely differ, and no network access
/// is involved.
pub struct MockEmbeddingProvider {
    dimensions: usize,
}

impl MockEmbeddingProvider {
    pub fn new() -> Self {
        Self { dimensions: 32 }
    }

    pub fn with_dimensions(dimensions: usize) -> Self {
        Self { dimensions }
    }

    fn vector_for(&self, text: &str) -> Vec<f32> {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut values = Vec::with_capacity(self.dimensions);
        for position in 0..self.dimensions {
            let mut hasher = DefaultHasher::new();
            text.hash(&mut hasher);
            position.hash(&mut hasher);
            let bucket = hasher.finish() % 2_000;
            values.push(bucket as f32 / 1_000.0 - 1.0);
        }
        let norm = values.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for value in &mut values {
                *value /= norm;
            }
        }
        values
    }
}

impl Default for MockEmbeddingProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EmbeddingProvider for MockEmbeddingProvider {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed_batch(
        &self,
        texts: &[String],
        _role: EmbeddingRole,
    ) -> Result<Vec<Vec<f32>>, RetrievalError> {
        Ok(texts.iter().map(|text| self.vector_for(text)).collect())
    }
}

/// Instruction prefixes used by BGE-style retrieval models.
const QUERY_INSTRUCTION: &str = "Represent this sentence for searching relevant passages: ";
const PASSAGE_INSTRUCTION: &str = "Represent this sentence for retrieving relevant passages: ";

fn instruct(text: &str, role: EmbeddingRole) -> String {
    match role {
        EmbeddingRole::Query => format!("{QUERY_INSTRUCTION}{text}"),
        EmbeddingRole::Passage => format!("{PASSAGE_INSTRUCTION}{text}"),
    }
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: Vec<String>,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

/// Remote embedding service speaking a minimal JSON contract.
///
/// Request: `{"model": "...", "input": ["...", ...]}`; response:
/// `{"embeddings": [[...], ...]}`. Texts are prefixed with the BGE retrieval
/// instruction matching the [`EmbeddingRole`].
pub struct HttpEmbeddingProvider {
    endpoint: Url,
    model: String,
    dimensions: usize,
    client: OnceLock<Client>,
}

impl HttpEmbeddingProvider {
    pub fn new(endpoint: Url, model: impl Into<String>, dimensions: usize) -> Self {
        Self {
            endpoint,
            model: model.into(),
            dimensions,
            client: OnceLock::new(),
        }
    }

    /// The HTTP client is built once on first use and shared by all
    /// subsequent requests, including concurrent ones.
    fn client(&self) -> &Client {
        self.client.get_or_init(Client::new)
    }
}

#[async_trait]
impl EmbeddingProvider for HttpEmbeddingProvider {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed_batch(
        &self,
        texts: &[String],
        role: EmbeddingRole,
    ) -> Result<Vec<Vec<f32>>, RetrievalError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let request = EmbedRequest {
            model: &self.model,
            input: texts.iter().map(|text| instruct(text, role)).collect(),
        };
        let response = self
            .client()
            .post(self.endpoint.clone())
            .json(&request)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|err| RetrievalError::Embedding(err.to_string()))?;
        let payload: EmbedResponse = response
            .json()
            .await
            .map_err(|err| RetrievalError::Embedding(err.to_string()))?;
        if payload.embeddings.len() != texts.len() {
            return Err(RetrievalError::Embedding(format!(
                "expected {} vectors, got {}",
                texts.len(),
                payload.embeddings.len()
            )));
        }
        Ok(payload.embeddings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    #[tokio::test]
    async fn mock_embeddings_are_deterministic() {
        let provider = MockEmbeddingProvider::new();
        let inputs = vec![
            "Hello world".to_string(),
            "Goodbye world".to_string(),
            "Hello world".to_string(),
        ];

        let first = provider
            .embed_batch(&inputs, EmbeddingRole::Passage)
            .await
            .unwrap();
        let second = provider
            .embed_batch(&inputs, EmbeddingRole::Passage)
            .await
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(first[0], first[2], "identical text embeds identically");
        assert_ne!(first[0], first[1], "different text embeds differently");
    }

    #[tokio::test]
    async fn mock_embeddings_are_unit_length() {
        let provider = MockEmbeddingProvider::with_dimensions(16);
        let vectors = provider
            .embed_batch(&["abc".to_string()], EmbeddingRole::Query)
            .await
            .unwrap();
        assert_eq!(vectors[0].len(), 16);
        let norm: f32 = vectors[0].iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-4);
    }

    #[tokio::test]
    async fn http_provider_prefixes_by_role() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/embed")
                    .json_body_partial(
                        json!({
                            "input": [format!("{QUERY_INSTRUCTION}where is auth handled?")]
                        })
                        .to_string(),
                    );
                then.status(200)
                    .json_body(json!({ "embeddings": [[0.1, 0.2, 0.3]] }));
            })
            .await;

        let endpoint = Url::parse(&server.url("/embed")).unwrap();
        let provider = HttpEmbeddingProvider::new(endpoint, "bge-base-en-v1.5", 3);
        let vectors = provider
            .embed_batch(
                &["where is auth handled?".to_string()],
                EmbeddingRole::Query,
            )
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(vectors, vec![vec![0.1, 0.2, 0.3]]);
    }

    #[tokio::test]
    async fn http_provider_reports_embedding_failures() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/embed");
                then.status(500);
            })
            .await;

        let endpoint = Url::parse(&server.url("/embed")).unwrap();
        let provider = HttpEmbeddingProvider::new(endpoint, "bge-base-en-v1.5", 3);
        let err = provider
            .embed_batch(&["anything".to_string()], EmbeddingRole::Passage)
            .await
            .unwrap_err();
        assert!(matches!(err, RetrievalError::Embedding(_)));
    }

    #[tokio::test]
    async fn http_provider_rejects_mismatched_vector_count() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/embed");
                then.status(200).json_body(json!({ "embeddings": [[0.1]] }));
            })
            .await;

        let endpoint = Url::parse(&server.url("/embed")).unwrap();
        let provider = HttpEmbeddingProvider::new(endpoint, "bge-base-en-v1.5", 1);
        let err = provider
            .embed_batch(
                &["one".to_string(), "two".to_string()],
                EmbeddingRole::Passage,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, RetrievalError::Embedding(_)));
    }
}
