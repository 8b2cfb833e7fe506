//! Wire types shared by all three search backend adapters.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Topic {
    General,
    News,
    Finance,
}

impl Default for Topic {
    fn default() -> Self {
        Topic::General
    }
}

impl Topic {
    /// Topic→categories mapping used by the SearchOnly adapter (spec §4.1):
    /// `news|finance → ["news"]`, else `["general"]`.
    pub fn categories(self) -> Vec<&'static str> {
        match self {
            Topic::News | Topic::Finance => vec!["news"],
            Topic::General => vec!["general"],
        }
    }
}

/// A single query as supplied by the external query planner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Query {
    pub text: String,
    #[serde(default)]
    pub topic: Topic,
    #[serde(default = "default_max_results")]
    pub max_results: u32,
    #[serde(default)]
    pub include_raw_content: bool,
}

fn default_max_results() -> u32 {
    5
}

/// Options shared across all queries in a dispatch run — the parameter
/// surface SearchOnly exposes in full; the other two backends use a subset.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryOptions {
    pub time_range: Option<TimeRange>,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
    pub days: Option<u32>,
    pub include_domains: Option<Vec<String>>,
    pub exclude_domains: Option<Vec<String>>,
    pub language: Option<String>,
    pub engines: Option<Vec<String>>,
    pub safesearch: Option<SafeSearch>,
    pub search_depth: Option<SearchDepth>,
    pub include_answer: bool,
    pub include_images: bool,
    pub llm_provider: Option<String>,
    pub llm_model: Option<String>,
    pub answer_max_tokens: Option<u32>,
    pub answer_temperature: Option<f64>,
    pub answer_context_size: Option<u32>,
    pub timeout_secs: Option<u64>,
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeRange {
    Day,
    Week,
    Month,
    Year,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SafeSearch {
    Off,
    Moderate,
    Strict,
}

impl Default for SafeSearch {
    fn default() -> Self {
        SafeSearch::Strict
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchDepth {
    Basic,
    Advanced,
}

impl Default for SearchDepth {
    fn default() -> Self {
        SearchDepth::Basic
    }
}

/// A single search result. `url` is the identity used by the Result
/// Normalizer (spec §3): two `Result`s with equal url collide, first
/// occurrence wins, later occurrences may still contribute images.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Result {
    pub url: String,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub raw_content: Option<String>,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub img_src: Option<String>,
    #[serde(default)]
    pub published_date: Option<String>,
}

/// Tavily-compatible response envelope common to all three backends
/// (spec §4.1). Response-level errors are non-fatal: an empty `results`
/// list with `error` populated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendResponse {
    pub query: String,
    #[serde(default)]
    pub results: Vec<Result>,
    #[serde(default)]
    pub answer: Option<String>,
    #[serde(default)]
    pub images: Option<Vec<String>>,
    #[serde(default)]
    pub follow_up_questions: Option<Vec<String>>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub response_time: Option<f64>,
}
