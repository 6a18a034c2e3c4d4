//! GitHub-backed document source.
//!
//! Lists a repository's files through the git tree endpoint and pulls raw
//! contents per file. The API base is injectable so tests can point the
//! source at a local mock server.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, warn};
use url::Url;

use super::{DocumentFilter, DocumentSource};
use crate::types::{Document, RetrievalError};

const DEFAULT_API_BASE: &str = "https://api.github.com/";
const USER_AGENT: &str = concat!("reposense/", env!("CARGO_PKG_VERSION"));

/// Loads repository files through the GitHub REST API.
pub struct GithubSource {
    client: Client,
    api_base: Url,
    repo: String,
    token: Option<String>,
}

#[derive(Deserialize)]
struct TreeResponse {
    tree: Vec<TreeEntry>,
}

#[derive(Deserialize)]
struct TreeEntry {
    path: String,
    #[serde(rename = "type")]
    kind: String,
}

impl GithubSource {
    /// Source for `owner/repo` against the public GitHub API.
    pub fn new(repo: impl Into<String>, token: Option<String>) -> Self {
        let api_base = Url::parse(DEFAULT_API_BASE).expect("default API base is a valid URL");
        Self::with_api_base(api_base, repo, token)
    }

    /// Source against a custom API base (enterprise instances, tests).
    pub fn with_api_base(api_base: Url, repo: impl Into<String>, token: Option<String>) -> Self {
        Self {
            client: Client::new(),
            api_base,
            repo: repo.into(),
            token,
        }
    }

    fn get(&self, url: Url) -> reqwest::RequestBuilder {
        let mut builder = self.client.get(url).header("User-Agent", USER_AGENT);
        if let Some(token) = &self.token {
            builder = builder.bearer_auth(token);
        }
        builder
    }

    fn endpoint(&self, path: &str) -> Result<Url, RetrievalError> {
        self.api_base
            .join(path)
            .map_err(|err| RetrievalError::Source(err.to_string()))
    }
}

#[async_trait]
impl DocumentSource for GithubSource {
    async fn load_documents(
        &self,
        filter: &DocumentFilter,
    ) -> Result<Vec<Document>, RetrievalError> {
        let tree_url =
            self.endpoint(&format!("repos/{}/git/trees/HEAD?recursive=1", self.repo))?;
        let response = self
            .get(tree_url)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|err| RetrievalError::Source(err.to_string()))?;
        let listing: TreeResponse = response
            .json()
            .await
            .map_err(|err| RetrievalError::Source(err.to_string()))?;

        let mut documents = Vec::new();
        for entry in listing.tree {
            if entry.kind != "blob" || !filter.matches(&entry.path) {
                continue;
            }
            match self.fetch_file_content(&self.repo, &entry.path).await? {
                Some(text) => documents.push(Document::new(entry.path, text, self.repo.clone())),
                None => debug!(path = %entry.path, "listed file unavailable, skipping"),
            }
        }
        debug!(repo = %self.repo, count = documents.len(), "loaded documents");
        Ok(documents)
    }

    async fn fetch_file_content(
        &self,
        repo_id: &str,
        path: &str,
    ) -> Result<Option<String>, RetrievalError> {
        let url = self.endpoint(&format!("repos/{repo_id}/contents/{path}"))?;
        let response = self
            .get(url)
            .header("Accept", "application/vnd.github.raw")
            .send()
            .await
            .map_err(|err| RetrievalError::Source(err.to_string()))?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = response
            .error_for_status()
            .map_err(|err| RetrievalError::Source(err.to_string()))?;
        let bytes = response
            .bytes()
            .await
            .map_err(|err| RetrievalError::Source(err.to_string()))?;
        match String::from_utf8(bytes.to_vec()) {
            Ok(text) => Ok(Some(text)),
            Err(_) => {
                warn!(path, "skipping file that does not decode as UTF-8");
                Ok(None)
            }
        }
    }
}
