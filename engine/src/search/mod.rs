//! Search backends
//!
//! The orchestrator may ask for outside information by embedding a
//! `{"search_query": "..."}` fragment in its plan. A [`SearchProvider`] turns
//! that query into hits that are handed to the executor alongside the
//! sub-task prompt.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub mod searxng;

pub use searxng::SearxngProvider;

/// Errors from a search backend
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("Search request failed: {0}")]
    Network(String),

    #[error("Search backend returned status {0}")]
    Status(u16),

    #[error("Failed to parse search response: {0}")]
    Parse(String),
}

impl From<SearchError> for sdk::errors::EngineError {
    fn from(err: SearchError) -> Self {
        sdk::errors::EngineError::Search(err.to_string())
    }
}

/// One search result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub snippet: String,
}

#[async_trait]
pub trait SearchProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn search(&self, query: &str) -> Result<Vec<SearchHit>, SearchError>;
}

/// What the executor receives for a search request
#[derive(Debug, Clone, PartialEq)]
pub enum SearchContext {
    /// No backend answered, so the bare query is passed through
    Query(String),

    /// Hits returned by a backend
    Results { query: String, hits: Vec<SearchHit> },
}

impl SearchContext {
    pub fn query(&self) -> &str {
        match self {
            SearchContext::Query(query) => query,
            SearchContext::Results { query, .. } => query,
        }
    }

    /// Text block appended to an executor prompt
    pub fn render(&self) -> String {
        match self {
            SearchContext::Query(query) => format!("Search Query:\n{}", query),
            SearchContext::Results { query, hits } if hits.is_empty() => {
                format!("Search Results:\nNo results found for \"{}\".", query)
            }
            SearchContext::Results { query, hits } => {
                let mut out = format!("Search Results for \"{}\":", query);
                for (i, hit) in hits.iter().enumerate() {
                    out.push_str(&format!("\n{}. {} ({})", i + 1, hit.title, hit.url));
                    if !hit.snippet.is_empty() {
                        out.push_str(&format!("\n   {}", hit.snippet));
                    }
                }
                out
            }
        }
    }
}
