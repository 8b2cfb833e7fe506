//! ReferenceBackend adapter — the canonical hosted search API fallback.
//!
//! Basic parameters only: the thinnest of the three adapters, used when
//! neither a self-hosted SearchOnly nor SearchAndCrawl endpoint is
//! configured.

use reqwest::Client;
use std::time::Duration;
use tracing::warn;

use crate::error::SearchError;
use crate::search::types::{BackendResponse, Query, QueryOptions};

pub struct ReferenceBackend {
    client: Client,
    base_url: String,
}

impl ReferenceBackend {
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(60))
            .build()
            .expect("reqwest client builder should not fail with only timeout settings set");

        Self {
            client,
            base_url: base_url.into(),
        }
    }

    pub async fn search(&self, query: &Query, options: &QueryOptions) -> BackendResponse {
        let timeout = Duration::from_secs(options.timeout_secs.unwrap_or(60));

        match tokio::time::timeout(timeout, self.do_search(query)).await {
            Ok(Ok(response)) => response,
            Ok(Err(err)) => {
                warn!(query = %query.text, error = %err, "reference backend request failed");
                super::error_envelope(&query.text, err)
            }
            Err(_) => {
                warn!(query = %query.text, "reference backend request timed out");
                super::error_envelope(&query.text, SearchError::Timeout(timeout))
            }
        }
    }

    async fn do_search(&self, query: &Query) -> std::result::Result<BackendResponse, SearchError> {
        let payload = serde_json::json!({
            "query": query.text,
            "max_results": query.max_results,
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
