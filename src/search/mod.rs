//! Pluggable search backend abstraction.
//!
//! Three adapters share one Tavily-compatible response envelope. The set of
//! variants is closed, so this follows the teacher's preference for a sum
//! type over `dyn Trait`.

mod reference;
mod search_and_crawl;
mod search_only;
pub mod types;

pub use reference::ReferenceBackend;
pub use search_and_crawl::SearchAndCrawlBackend;
pub use search_only::SearchOnlyBackend;
pub use types::{BackendResponse, Query, QueryOptions, Result as SearchResult, Topic};

use crate::error::SearchError;

/// One of the three configured search backends.
///
/// `search()` never returns `Err` for network/HTTP/timeout failures — those
/// are captured into `BackendResponse::error` so the dispatcher never has to
/// abort the pipeline over a single bad query (spec §4.1, §7).
pub enum Backend {
    SearchOnly(SearchOnlyBackend),
    SearchAndCrawl(SearchAndCrawlBackend),
    Reference(ReferenceBackend),
}

impl Backend {
    pub async fn search(&self, query: &Query, options: &QueryOptions) -> BackendResponse {
        match self {
            Backend::SearchOnly(b) => b.search(query, options).await,
            Backend::SearchAndCrawl(b) => b.search(query, options).await,
            Backend::Reference(b) => b.search(query, options).await,
        }
    }

    /// True for the one backend whose results already carry full-page
    /// `raw_content`, which means the Crawl Enricher (§4.3) must be skipped.
    pub fn delivers_raw_content(&self) -> bool {
        matches!(self, Backend::SearchAndCrawl(_))
    }

    pub async fn close(&self) {
        match self {
            Backend::SearchOnly(b) => b.close().await,
            Backend::SearchAndCrawl(b) => b.close().await,
            Backend::Reference(b) => b.close().await,
        }
    }
}

/// Builds the empty-results envelope used whenever an adapter catches a
/// network/HTTP/timeout failure (spec §4.1: "adapters never throw").
pub(crate) fn error_envelope(query: &str, error: SearchError) -> BackendResponse {
    BackendResponse {
        query: query.to_string(),
        results: Vec::new(),
        answer: None,
        images: None,
        follow_up_questions: None,
        error: Some(error.to_string()),
        response_time: None,
    }
}
