//! Shared data model for the pipeline (spec §3).
//!
//! `UniqueResultSet` is the core invariant-bearing type: first-occurrence
//! wins on insert, insertion order is preserved for stable output, matching
//! `original_source/.../utils.py`'s `unique_results` dict (Python dicts
//! preserve insertion order, which is exactly the behavior `IndexMap` gives
//! here without relying on an implementation detail of another language).

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::search::Topic;

/// Pipeline input as supplied by the external query planner (spec §6).
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineInput {
    pub queries: Vec<String>,
    #[serde(default = "default_max_results")]
    pub max_results: u32,
    #[serde(default)]
    pub topic: Topic,
    #[serde(default)]
    pub include_raw_content: bool,
}

fn default_max_results() -> u32 {
    5
}

/// One URL's accumulated state across normalization, crawl enrichment, and
/// summarization. `content` is the backend snippet and is never overwritten
/// by crawl or summarization — it is the guaranteed fallback value.
#[derive(Debug, Clone)]
pub struct UniqueResult {
    pub url: String,
    pub title: String,
    pub content: String,
    pub raw_content: Option<String>,
    pub origin_query: String,
    pub score: Option<f64>,
    pub published_date: Option<String>,
}

/// URL-keyed, insertion-ordered table (spec §3: "Key uniqueness is the core
/// invariant. Insertion order is preserved for stable output.").
#[derive(Debug, Default)]
pub struct UniqueResultSet {
    entries: IndexMap<String, UniqueResult>,
}

impl UniqueResultSet {
    pub fn new() -> Self {
        Self {
            entries: IndexMap::new(),
        }
    }

    pub fn contains(&self, url: &str) -> bool {
        self.entries.contains_key(url)
    }

    /// Inserts `result` only if `url` has not been seen before. Returns
    /// `true` if this was a new insertion (spec §3: "first occurrence wins;
    /// later occurrences are discarded but may contribute images").
    pub fn insert_if_absent(&mut self, result: UniqueResult) -> bool {
        if self.entries.contains_key(&result.url) {
            return false;
        }
        self.entries.insert(result.url.clone(), result);
        true
    }

    pub fn get_mut(&mut self, url: &str) -> Option<&mut UniqueResult> {
        self.entries.get_mut(url)
    }

    pub fn get(&self, url: &str) -> Option<&UniqueResult> {
        self.entries.get(url)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// URLs in first-seen order, the order the Crawl Enricher and Summarizer
    /// must preserve positionally (spec §5).
    pub fn urls(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &UniqueResult)> {
        self.entries.iter()
    }
}

/// A harvested image reference (spec §3 ImageRef).
#[derive(Debug, Clone, Serialize)]
pub struct ImageRef {
    pub image_url: String,
    pub source_title: String,
    pub source_page_url: String,
}

/// Structured per-URL summary produced by the LLM (spec §3, §4.4).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Summary {
    pub summary: String,
    pub key_excerpts: String,
}

/// Outcome of attempting to summarize a single URL. `Skipped` is the
/// "sentinel no-op" spec §4.4 requires for URLs with no raw content, so
/// positional alignment across the fan-out is preserved without spending an
/// LLM call on it.
#[derive(Debug, Clone)]
pub enum SummaryOutcome {
    Produced(Summary),
    Failed,
    Skipped,
}

/// Embedded machine-readable run record (spec §3, §4.5).
#[derive(Debug, Clone, Serialize)]
pub struct SearchLog {
    pub timestamp: String,
    pub queries: Vec<String>,
    pub parameters: serde_json::Value,
    pub raw_responses: Vec<crate::search::BackendResponse>,
    pub processed_count: usize,
}
