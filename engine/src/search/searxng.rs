//! SearxNG JSON API backend.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use super::{SearchError, SearchHit, SearchProvider};

pub struct SearxngProvider {
    base_url: String,
    max_results: usize,
    timeout: Duration,
    client: reqwest::Client,
}

impl SearxngProvider {
    pub fn new(base_url: impl Into<String>, max_results: usize, timeout: Duration) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            max_results,
            timeout,
            client: reqwest::Client::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SearxngResponse {
    #[serde(default)]
    results: Vec<SearxngResult>,
}

#[derive(Debug, Deserialize)]
struct SearxngResult {
    #[serde(default)]
    title: String,
    url: String,
    #[serde(default)]
    content: String,
}

#[async_trait]
impl SearchProvider for SearxngProvider {
    fn name(&self) -> &str {
        "searxng"
    }

    async fn search(&self, query: &str) -> Result<Vec<SearchHit>, SearchError> {
        let url = format!("{}/search", self.base_url);

        let response = self
            .client
            .get(&url)
            .query(&[("q", query), ("format", "json")])
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| SearchError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(SearchError::Status(response.status().as_u16()));
        }

        let body: SearxngResponse = response
            .json()
            .await
            .map_err(|e| SearchError::Parse(e.to_string()))?;

        let hits: Vec<SearchHit> = body
            .results
            .into_iter()
            .take(self.max_results)
            .map(|r| SearchHit {
                title: r.title,
                url: r.url,
                snippet: r.content.trim().to_string(),
            })
            .collect();

        tracing::debug!("SearxNG returned {} hits for '{}'", hits.len(), query);
        Ok(hits)
    }
}
