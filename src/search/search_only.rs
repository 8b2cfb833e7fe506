//! SearchOnly backend adapter.
//!
//! Ported from `AsyncPerplexicaClient.search()`: calls a remote endpoint
//! that returns results + optional generated answer + optional `img_src`,
//! but never `raw_content` — enrichment is always handled downstream by the
//! Crawl Enricher for this backend.

use reqwest::Client;
use std::time::Duration;
use tracing::warn;

use crate::error::SearchError;
use crate::search::types::{BackendResponse, Query, QueryOptions, TimeRange, Topic};

pub struct SearchOnlyBackend {
    client: Client,
    base_url: String,
}

impl SearchOnlyBackend {
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(300))
            .build()
            .expect("reqwest client builder should not fail with only timeout settings set");

        Self {
            client,
            base_url: base_url.into(),
        }
    }

    pub async fn search(&self, query: &Query, options: &QueryOptions) -> BackendResponse {
        let timeout = Duration::from_secs(options.timeout_secs.unwrap_or(300));

        match tokio::time::timeout(timeout, self.do_search(query, options)).await {
            Ok(Ok(response)) => response,
            Ok(Err(err)) => {
                warn!(query = %query.text, error = %err, "search-only backend request failed");
                super::error_envelope(&query.text, err)
            }
            Err(_) => {
                warn!(query = %query.text, "search-only backend request timed out");
                super::error_envelope(&query.text, SearchError::Timeout(timeout))
            }
        }
    }

    async fn do_search(
        &self,
        query: &Query,
        options: &QueryOptions,
    ) -> std::result::Result<BackendResponse, SearchError> {
        let payload = build_payload(query, options);

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

/// Builds the exact SearchOnly request envelope from spec §6, applying the
/// topic-driven `time_range` default (month, for news/finance with no
/// explicit time window) and the topic→categories mapping.
fn build_payload(query: &Query, options: &QueryOptions) -> serde_json::Value {
    let categories = query.topic.categories();

    let time_range = options.time_range.or_else(|| {
        let no_explicit_window =
            options.date_from.is_none() && options.date_to.is_none() && options.days.is_none();
        if matches!(query.topic, Topic::News | Topic::Finance) && no_explicit_window {
            Some(TimeRange::Month)
        } else {
            None
        }
    });

    serde_json::json!({
        "query": query.text,
        "max_results": query.max_results,
        "include_raw_content": query.include_raw_content,
        "include_answer": options.include_answer,
        "include_images": options.include_images,
        "search_depth": options.search_depth.unwrap_or_default(),
        "language": options.language.clone().unwrap_or_else(|| "en".to_string()),
        "categories": categories,
        "time_range": time_range,
        "date_from": options.date_from,
        "date_to": options.date_to,
        "days": options.days,
        "include_domains": options.include_domains,
        "exclude_domains": options.exclude_domains,
        "engines": options.engines,
        "safesearch": options.safesearch.unwrap_or_default(),
        "llm_provider": options.llm_provider,
        "llm_model": options.llm_model,
        "answer_max_tokens": options.answer_max_tokens,
        "answer_temperature": options.answer_temperature,
        "answer_context_size": options.answer_context_size,
        "timeout": options.timeout_secs,
        "api_key": options.api_key,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn news_topic_defaults_time_range_to_month() {
        let query = Query {
            text: "election results".into(),
            topic: Topic::News,
            max_results: 5,
            include_raw_content: false,
        };
        let payload = build_payload(&query, &QueryOptions::default());
        assert_eq!(payload["time_range"], "month");
        assert_eq!(payload["categories"], serde_json::json!(["news"]));
    }

    #[test]
    fn explicit_days_window_suppresses_default_time_range() {
        let query = Query {
            text: "market update".into(),
            topic: Topic::Finance,
            max_results: 5,
            include_raw_content: false,
        };
        let options = QueryOptions {
            days: Some(7),
            ..Default::default()
        };
        let payload = build_payload(&query, &options);
        assert!(payload["time_range"].is_null());
    }

    #[test]
    fn general_topic_categories() {
        let query = Query {
            text: "rust async runtimes".into(),
            topic: Topic::General,
            max_results: 5,
            include_raw_content: false,
        };
        let payload = build_payload(&query, &QueryOptions::default());
        assert_eq!(payload["categories"], serde_json::json!(["general"]));
        assert!(payload["time_range"].is_null());
    }
}
