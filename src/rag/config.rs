//! `RagConfig` (spec §4.7, §6): the RAG workflow's own environment-derived
//! settings, kept separate from `PipelineConfig` since the two subsystems
//! are independently deployable collaborators (spec's "external
//! collaborator" framing for NL2SQL/chart services).

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::llm::client::LlmClient;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagConfig {
    pub database_url: String,
    #[serde(default = "default_llm_provider")]
    pub llm_provider: String,
    pub llm_api_key: String,
    #[serde(default = "default_llm_model")]
    pub llm_model: String,
    #[serde(default = "default_max_tokens")]
    pub llm_max_tokens: u64,
    #[serde(default = "default_max_retries")]
    pub max_structured_output_retries: u32,
    pub openai_api_key: String,
}

fn default_llm_provider() -> String {
    "openai".to_string()
}
fn default_llm_model() -> String {
    "gpt-4o-mini".to_string()
}
fn default_max_tokens() -> u64 {
    1500
}
fn default_max_retries() -> u32 {
    2
}

impl RagConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = std::env::var("RAG_DATABASE_URL")
            .map_err(|_| ConfigError::Missing("RAG_DATABASE_URL".to_string()))?;

        let llm_api_key = std::env::var("DEEP_RESEARCH_LLM_API_KEY")
            .or_else(|_| std::env::var("OPENAI_API_KEY"))
            .or_else(|_| std::env::var("ANTHROPIC_API_KEY"))
            .map_err(|_| ConfigError::Missing("DEEP_RESEARCH_LLM_API_KEY".to_string()))?;

        let openai_api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| ConfigError::Missing("OPENAI_API_KEY".to_string()))?;

        let llm_provider = std::env::var("RAG_LLM_PROVIDER").unwrap_or_else(|_| default_llm_provider());
        let llm_model = std::env::var("RAG_LLM_MODEL").unwrap_or_else(|_| default_llm_model());
        let llm_max_tokens = std::env::var("RAG_LLM_MAX_TOKENS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or_else(default_max_tokens);
        let max_structured_output_retries = std::env::var("RAG_MAX_STRUCTURED_OUTPUT_RETRIES")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or_else(default_max_retries);

        Ok(Self {
            database_url,
            llm_provider,
            llm_api_key,
            llm_model,
            llm_max_tokens,
            max_structured_output_retries,
            openai_api_key,
        })
    }

    pub fn llm_client(&self) -> LlmClient {
        match self.llm_provider.as_str() {
            "anthropic" => LlmClient::anthropic(&self.llm_api_key, &self.llm_model, self.llm_max_tokens),
            _ => LlmClient::openai(&self.llm_api_key, &self.llm_model, self.llm_max_tokens),
        }
    }
}
