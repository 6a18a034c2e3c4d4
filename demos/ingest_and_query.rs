//! Ingest a local directory and run a query against it.
//!
//! Uses the deterministic mock embedder and the in-memory index, so it runs
//! without any services:
//!
//! ```bash
//! cargo run --example ingest_and_query -- ./corpus "how does billing work?"
//! ```

use std::env;
use std::sync::Arc;

use reposense::embeddings::MockEmbeddingProvider;
use reposense::sources::{DocumentFilter, DocumentSource, FsSource};
use reposense::stores::MemoryVectorIndex;
use reposense::types::RetrievalError;
use reposense::{IngestionPipeline, QueryPipeline};

#[tokio::main]
async fn main() -> Result<(), RetrievalError> {
    init_tracing();

    let mut args = env::args().skip(1);
    let root = args.next().unwrap_or_else(|| ".".to_string());
    let query = args
        .next()
        .unwrap_or_else(|| "how does billing work?".to_string());

    let embedder = Arc::new(MockEmbeddingProvider::new());
    let index = Arc::new(MemoryVectorIndex::new());
    let source: Arc<dyn DocumentSource> = Arc::new(FsSource::new(&root, "local/corpus"));

    let ingestion = IngestionPipeline::new(embedder.clone(), index.clone());
    let indexed = ingestion
        .ingest_source(source.as_ref(), &DocumentFilter::legacy_defaults())
        .await?;
    println!("Indexed {indexed} chunks from {root}");

    let pipeline = QueryPipeline::new(embedder, index).with_source(source);
    let outcome = pipeline.retrieve(&query, 5).await?;
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
        println!("{:>2}. {:.3}  {}", rank + 1, result.score, path);
    }
    if let Some(content) = outcome.file_content {
        println!("\nTop match file content ({} bytes available)", content.len());
    }
    Ok(())
}

fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();
}
