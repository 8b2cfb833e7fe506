//! Search Dispatcher (spec §4.2): serial query execution with inter-query
//! pacing, cancellable before each new query starts and during the active
//! request.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::search::{Backend, BackendResponse, Query, QueryOptions};

/// Dispatches `queries` to `backend` one at a time, sleeping
/// `inter_query_delay` between requests (default 5s per spec §4.2).
/// Returns one `BackendResponse` per query that was actually issued —
/// cancellation truncates the list rather than padding it, since the
/// Normalizer only ever walks `queries.iter().zip(responses.iter())` and a
/// short `responses` naturally excludes not-yet-issued queries.
pub async fn dispatch(
    backend: &Backend,
    queries: &[Query],
    options: &QueryOptions,
    inter_query_delay: Duration,
    cancel: &CancellationToken,
) -> Vec<BackendResponse> {
    let mut responses = Vec::with_capacity(queries.len());

    for (idx, query) in queries.iter().enumerate() {
        if cancel.is_cancelled() {
            break;
        }

        if idx > 0 {
            tokio::select! {
                _ = tokio::time::sleep(inter_query_delay) => {}
                _ = cancel.cancelled() => break,
            }
        }

        info!(query = %query.text, idx, "dispatching query");

        let response = tokio::select! {
            resp = backend.search(query, options) => resp,
            _ = cancel.cancelled() => break,
        };

        responses.push(response);
    }

    responses
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::ReferenceBackend;

    #[tokio::test]
    async fn stops_issuing_queries_once_cancelled() {
        let backend = Backend::Reference(ReferenceBackend::new("http://127.0.0.1:1".to_string()));
        let queries = vec![
            Query {
                text: "a".into(),
                topic: Default::default(),
                max_results: 5,
                include_raw_content: false,
            },
            Query {
                text: "b".into(),
                topic: Default::default(),
                max_results: 5,
                include_raw_content: false,
            },
        ];
        let cancel = CancellationToken::new();
        cancel.cancel();

        let responses = dispatch(
            &backend,
            &queries,
            &QueryOptions::default(),
            Duration::from_secs(0),
            &cancel,
        )
        .await;

        assert!(responses.is_empty());
    }
}
