//! SearchAndCrawl backend adapter.
//!
//! Ported from `AsyncSearCrawlClient.search()`: the endpoint both searches
//! and crawls, returning full `raw_content` per result, so the Crawl
//! Enricher is skipped entirely when this backend is active (spec §4.1,
//! §4.9). Uses `limit` rather than `max_results` in the wire payload.

use reqwest::Client;
use std::time::Duration;
use tracing::warn;

use crate::error::SearchError;
use crate::search::types::{BackendResponse, Query, QueryOptions};

pub struct SearchAndCrawlBackend {
    client: Client,
    base_url: String,
}

impl SearchAndCrawlBackend {
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(180))
            .build()
            .expect("reqwest client builder should not fail with only timeout settings set");

        Self {
            client,
            base_url: base_url.into(),
        }
    }

    pub async fn search(&self, query: &Query, options: &QueryOptions) -> BackendResponse {
        let timeout = Duration::from_secs(options.timeout_secs.unwrap_or(180));

        match tokio::time::timeout(timeout, self.do_search(query, options)).await {
            Ok(Ok(response)) => response,
            Ok(Err(err)) => {
                warn!(query = %query.text, error = %err, "search-and-crawl backend request failed");
                super::error_envelope(&query.text, err)
            }
            Err(_) => {
                warn!(query = %query.text, "search-and-crawl backend request timed out");
                super::error_envelope(&query.text, SearchError::Timeout(timeout))
            }
        }
    }

    async fn do_search(
        &self,
        query: &Query,
        options: &QueryOptions,
    ) -> std::result::Result<BackendResponse, SearchError> {
        let payload = serde_json::json!({
            "query": query.text,
            "limit": query.max_results,
            "include_raw_content": query.include_raw_content,
            "topic": query.topic,
            "timeout": options.timeout_secs,
        });

        let response = self
            .client
            .post(format!("{}/search", self.base_url))
            .json(&payload)
            .send()
            .await
            .map_err(|e| SearchError::RequestFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SearchError::HttpStatus {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<BackendResponse>()
            .await
            .map_err(|e| SearchError::RequestFailed(e.to_string()))
    }

    pub async fn close(&self) {}
}
