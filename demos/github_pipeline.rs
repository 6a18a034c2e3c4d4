//! Index a GitHub repository and query it, end to end.
//!
//! Requires a running embedding service and, for private repositories or
//! higher rate limits, a GitHub token:
//!
//! ```bash
//! REPOSENSE_EMBEDDING_URL=http://localhost:8080/embed \
//! GITHUB_TOKEN=... \
//! cargo run --example github_pipeline -- acme/widgets "how does billing work?"
//! ```

use std::env;
use std::sync::Arc;

use url::Url;

use reposense::embeddings::HttpEmbeddingProvider;
use reposense::sources::{DocumentFilter, DocumentSource, GithubSource};
use reposense::stores::SqliteVectorIndex;
use reposense::types::RetrievalError;
use reposense::{IngestionPipeline, QueryPipeline, Settings};

#[tokio::main]
async fn main() -> Result<(), RetrievalError> {
    init_tracing();

    let settings = Settings::from_env();
    let mut args = env::args().skip(1);
    let repo = args
        .next()
        .unwrap_or_else(|| "aws-samples/aws-mainframe-modernization-carddemo".to_string());
    let query = args
        .next()
        .unwrap_or_else(|| "how are card transactions posted?".to_string());

    let endpoint = Url::parse(&settings.embedding_endpoint)
        .map_err(|err| RetrievalError::InvalidDocument(err.to_string()))?;
    let embedder = Arc::new(HttpEmbeddingProvider::new(
        endpoint,
        settings.embedding_model.clone(),
        settings.vector_dimensions,
    ));
    let index = Arc::new(SqliteVectorIndex::open("reposense.sqlite", &settings.index_name).await?);
    let source: Arc<dyn DocumentSource> = Arc::new(GithubSource::new(
        repo.clone(),
        settings.github_token.clone(),
    ));

    let ingestion = IngestionPipeline::new(embedder.clone(), index.clone());
    let indexed = ingestion
        .ingest_source(source.as_ref(), &DocumentFilter::legacy_defaults())
        .await?;
    println!("Indexed {indexed} chunks from {repo}");

    let pipeline = QueryPipeline::new(embedder, index).with_source(source);
    let outcome = pipeline.retrieve(&query, 10).await?;
    if outcome.results.is_empty() {
        println!("No matches for {query:?}");
        return Ok(());
    }

    for (rank, result) in outcome.results.iter().enumerate() {
        let path = result
            .metadata
            .get("path")
            .and_then(|value| value.as_str())
            .unwrap_or("?");
        let role = result
            .metadata
            .get("file_type")
            .and_then(|value| value.as_str())
            .unwrap_or("?");
        println!("{:>2}. {:.3}  [{role}] {path}", rank + 1, result.score);
    }
    if let Some(content) = outcome.file_content {
        let preview: String = content.lines().take(5).collect::<Vec<_>>().join("\n");
        println!("\nTop match file preview:\n{preview}");
    }
    Ok(())
}

fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();
}
