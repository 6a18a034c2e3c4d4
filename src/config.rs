//! Environment-driven settings for wiring collaborators.
//!
//! Nothing in the pipelines reads the environment; callers resolve a
//! [`Settings`] once and construct collaborators from it.

use std::env;

const DEFAULT_INDEX_NAME: &str = "reposense-index";
const DEFAULT_VECTOR_DIM: usize = 768;
const DEFAULT_EMBEDDING_ENDPOINT: &str = "http://localhost:8080/embed";
const DEFAULT_EMBEDDING_MODEL: &str = "BAAI/bge-base-en-v1.5";

/// Collaborator wiring resolved from the environment, with local-friendly
/// defaults.
#[derive(Clone, Debug)]
pub struct Settings {
    /// Name of the vector index (table name for the sqlite backend).
    pub index_name: String,
    /// Width of the embedding vectors.
    pub vector_dimensions: usize,
    /// Endpoint of the HTTP embedding service.
    pub embedding_endpoint: String,
    /// Model identifier forwarded to the embedding service.
    pub embedding_model: String,
    /// Token for the GitHub document source, when configured.
    pub github_token: Option<String>,
}

impl Settings {
    /// Loads settings from the environment (and a `.env` file, when present).
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self {
            index_name: env::var("REPOSENSE_INDEX_NAME")
                .unwrap_or_else(|_| DEFAULT_INDEX_NAME.to_string()),
            vector_dimensions: env::var("REPOSENSE_VECTOR_DIM")
                .ok()
                .and_then(|value| value.parse().ok())
                .unwrap_or(DEFAULT_VECTOR_DIM),
            embedding_endpoint: env::var("REPOSENSE_EMBEDDING_URL")
                .unwrap_or_else(|_| DEFAULT_EMBEDDING_ENDPOINT.to_string()),
            embedding_model: env::var("REPOSENSE_EMBEDDING_MODEL")
                .unwrap_or_else(|_| DEFAULT_EMBEDDING_MODEL.to_string()),
            github_token: env::var("GITHUB_TOKEN").ok(),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            index_name: DEFAULT_INDEX_NAME.to_string(),
            vector_dimensions: DEFAULT_VECTOR_DIM,
            embedding_endpoint: DEFAULT_EMBEDDING_ENDPOINT.to_string(),
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            github_token: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_local_friendly() {
        let settings = Settings::default();
        assert_eq!(settings.index_name, "reposense-index");
        assert_eq!(settings.vector_dimensions, 768);
        assert_eq!(settings.embedding_model, "BAAI/bge-base-en-v1.5");
        assert!(settings.github_token.is_none());
    }
}
