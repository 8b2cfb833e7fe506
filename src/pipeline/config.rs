//! `PipelineConfig` (spec §3, §6): read once per run from the environment,
//! immutable for the run's duration. Shaped after the teacher's
//! `Config`/`BrowserConfig` (`lib.rs`): `serde`-derived defaults plus an
//! optional `config.yaml` override via `load_yaml_config`.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::llm::LlmClient;
use crate::search::{Backend, QueryOptions, ReferenceBackend, SearchAndCrawlBackend, SearchOnlyBackend};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub search_only_enabled: bool,
    #[serde(default)]
    pub search_and_crawl_enabled: bool,

    #[serde(default = "default_search_only_url")]
    pub search_only_url: String,
    #[serde(default = "default_search_and_crawl_url")]
    pub search_and_crawl_url: String,
    #[serde(default = "default_reference_url")]
    pub reference_url: String,

    #[serde(default = "default_inter_query_delay")]
    pub inter_query_delay_secs: u64,
    #[serde(default = "default_crawl_timeout")]
    pub crawl_timeout_secs: u64,
    #[serde(default = "default_content_threshold")]
    pub crawl_content_threshold: f32,

    #[serde(default = "default_summarizer_model")]
    pub summarizer_model: String,
    #[serde(default = "default_summarizer_max_tokens")]
    pub summarizer_max_tokens: u64,
    #[serde(default = "default_max_retries")]
    pub max_structured_output_retries: u32,
    #[serde(default = "default_max_content_length")]
    pub max_content_length: usize,

    /// `"openai"` or `"anthropic"` — selects the rig-core backend in
    /// `llm::LlmClient`.
    #[serde(default = "default_llm_provider")]
    pub llm_provider: String,
    #[serde(default)]
    pub llm_api_key: String,
}

fn default_search_only_url() -> String {
    "http://localhost:8090".to_string()
}
fn default_search_and_crawl_url() -> String {
    "http://localhost:8091".to_string()
}
fn default_reference_url() -> String {
    "https://api.tavily.com".to_string()
}
fn default_inter_query_delay() -> u64 {
    5
}
fn default_crawl_timeout() -> u64 {
    15
}
fn default_content_threshold() -> f32 {
    0.3
}
fn default_summarizer_model() -> String {
    "gpt-4o-mini".to_string()
}
fn default_summarizer_max_tokens() -> u64 {
    1024
}
fn default_max_retries() -> u32 {
    2
}
fn default_max_content_length() -> usize {
    40_000
}
fn default_llm_provider() -> String {
    "openai".to_string()
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            search_only_enabled: false,
            search_and_crawl_enabled: false,
            search_only_url: default_search_only_url(),
            search_and_crawl_url: default_search_and_crawl_url(),
            reference_url: default_reference_url(),
            inter_query_delay_secs: default_inter_query_delay(),
            crawl_timeout_secs: default_crawl_timeout(),
            crawl_content_threshold: default_content_threshold(),
            summarizer_model: default_summarizer_model(),
            summarizer_max_tokens: default_summarizer_max_tokens(),
            max_structured_output_retries: default_max_retries(),
            max_content_length: default_max_content_length(),
            llm_provider: default_llm_provider(),
            llm_api_key: String::new(),
        }
    }
}

impl PipelineConfig {
    /// Reads the variables from spec.md §6 via `std::env::var`, falling
    /// back to the teacher's `#[serde(default = "default_x")]` values. Fails
    /// fast (spec §7 `ConfigurationError`) only when the LLM API key is
    /// entirely absent, since every stage downstream of dispatch depends on
    /// it.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        config.search_only_enabled = env_bool("DEEP_RESEARCH_SEARCH_ONLY_ENABLED");
        config.search_and_crawl_enabled = env_bool("DEEP_RESEARCH_SEARCH_AND_CRAWL_ENABLED");

        if let Ok(v) = std::env::var("DEEP_RESEARCH_SEARCH_ONLY_URL") {
            config.search_only_url = v;
        }
        if let Ok(v) = std::env::var("DEEP_RESEARCH_SEARCH_AND_CRAWL_URL") {
            config.search_and_crawl_url = v;
        }
        if let Ok(v) = std::env::var("DEEP_RESEARCH_REFERENCE_URL") {
            config.reference_url = v;
        }
        if let Ok(v) = env_parse("DEEP_RESEARCH_INTER_QUERY_DELAY_SECS") {
            config.inter_query_delay_secs = v;
        }
        if let Ok(v) = env_parse("DEEP_RESEARCH_CRAWL_TIMEOUT_SECS") {
            config.crawl_timeout_secs = v;
        }
        if let Ok(v) = env_parse("DEEP_RESEARCH_CRAWL_CONTENT_THRESHOLD") {
            config.crawl_content_threshold = v;
        }
        if let Ok(v) = std::env::var("DEEP_RESEARCH_SUMMARIZER_MODEL") {
            config.summarizer_model = v;
        }
        if let Ok(v) = env_parse("DEEP_RESEARCH_SUMMARIZER_MAX_TOKENS") {
            config.summarizer_max_tokens = v;
        }
        if let Ok(v) = env_parse("DEEP_RESEARCH_MAX_STRUCTURED_OUTPUT_RETRIES") {
            config.max_structured_output_retries = v;
        }
        if let Ok(v) = env_parse("DEEP_RESEARCH_MAX_CONTENT_LENGTH") {
            config.max_content_length = v;
        }
        if let Ok(v) = std::env::var("DEEP_RESEARCH_LLM_PROVIDER") {
            config.llm_provider = v;
        }

        config.llm_api_key = std::env::var("DEEP_RESEARCH_LLM_API_KEY")
            .or_else(|_| std::env::var("OPENAI_API_KEY"))
            .or_else(|_| std::env::var("ANTHROPIC_API_KEY"))
            .map_err(|_| ConfigError::Missing("DEEP_RESEARCH_LLM_API_KEY".to_string()))?;

        Ok(config)
    }

    /// Builds the selected `Backend` (spec §9 Open Question (a)):
    /// `SearchAndCrawl` wins when both selectors are enabled.
    pub fn backend(&self) -> Backend {
        if self.search_and_crawl_enabled {
            Backend::SearchAndCrawl(SearchAndCrawlBackend::new(self.search_and_crawl_url.clone()))
        } else if self.search_only_enabled {
            Backend::SearchOnly(SearchOnlyBackend::new(self.search_only_url.clone()))
        } else {
            Backend::Reference(ReferenceBackend::new(self.reference_url.clone()))
        }
    }

    pub fn query_options(&self) -> QueryOptions {
        QueryOptions::default()
    }

    pub fn inter_query_delay(&self) -> Duration {
        Duration::from_secs(self.inter_query_delay_secs)
    }

    pub fn crawl_timeout(&self) -> Duration {
        Duration::from_secs(self.crawl_timeout_secs)
    }

    pub fn llm_client(&self) -> LlmClient {
        match self.llm_provider.as_str() {
            "anthropic" => {
                LlmClient::anthropic(&self.llm_api_key, &self.summarizer_model, self.summarizer_max_tokens)
            }
            _ => LlmClient::openai(&self.llm_api_key, &self.summarizer_model, self.summarizer_max_tokens),
        }
    }
}

fn env_bool(key: &str) -> bool {
    std::env::var(key)
        .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false)
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Result<T, ()> {
    std::env::var(key).ok().and_then(|v| v.parse().ok()).ok_or(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn both_selectors_enabled_prefers_search_and_crawl() {
        let config = PipelineConfig {
            search_only_enabled: true,
            search_and_crawl_enabled: true,
            ..Default::default()
        };
        assert!(matches!(config.backend(), Backend::SearchAndCrawl(_)));
    }

    #[test]
    fn neither_selector_falls_back_to_reference() {
        let config = PipelineConfig::default();
        assert!(matches!(config.backend(), Backend::Reference(_)));
    }
}
