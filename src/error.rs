//! Crate-wide error taxonomy.
//!
//! Each architectural area gets its own `thiserror` enum; `DeepResearchError`
//! composes them via `#[from]` so callers at the pipeline boundary can use a
//! single `?`-friendly type without losing the originating variant.

use thiserror::Error;

use crate::browser::BrowserError;

#[derive(Error, Debug)]
pub enum SearchError {
    #[error("backend request failed: {0}")]
    RequestFailed(String),

    #[error("backend returned HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("backend request timed out after {0:?}")]
    Timeout(std::time::Duration),
}

#[derive(Error, Debug)]
pub enum CrawlError {
    #[error("browser error: {0}")]
    Browser(#[from] BrowserError),

    #[error("crawl of {url} timed out after {timeout:?}")]
    Timeout {
        url: String,
        timeout: std::time::Duration,
    },

    #[error("navigation to {url} failed: {reason}")]
    NavigationFailed { url: String, reason: String },

    #[error("extracted markdown for {url} was empty")]
    EmptyContent { url: String },
}

/// LLM providers the token-limit classifier knows how to recognize.
///
/// Mirrors the `openai:` / `anthropic:` / `gemini:` prefixes used to key
/// `MODEL_TOKEN_LIMITS` in the original Python service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provider {
    OpenAi,
    Anthropic,
    Gemini,
    Unknown,
}

impl Provider {
    pub fn as_prefix(self) -> &'static str {
        match self {
            Provider::OpenAi => "openai",
            Provider::Anthropic => "anthropic",
            Provider::Gemini => "gemini",
            Provider::Unknown => "unknown",
        }
    }
}

#[derive(Error, Debug)]
pub enum LlmError {
    #[error("[{provider:?}] request failed: {message}")]
    RequestFailed {
        provider: Provider,
        message: String,
    },

    #[error("structured output did not parse after {attempts} attempts: {last_error}")]
    StructuredOutputFailed { attempts: u32, last_error: String },

    #[error("call timed out after {0:?}")]
    Timeout(std::time::Duration),
}

impl LlmError {
    pub fn provider(&self) -> Provider {
        match self {
            LlmError::RequestFailed { provider, .. } => *provider,
            _ => Provider::Unknown,
        }
    }

    pub fn raw_message(&self) -> String {
        match self {
            LlmError::RequestFailed { message, .. } => message.clone(),
            LlmError::StructuredOutputFailed { last_error, .. } => last_error.clone(),
            LlmError::Timeout(d) => format!("timeout after {d:?}"),
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required configuration: {0}")]
    Missing(String),

    #[error("invalid configuration value for {key}: {reason}")]
    Invalid { key: String, reason: String },
}

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Search(#[from] SearchError),

    #[error(transparent)]
    Crawl(#[from] CrawlError),

    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("pipeline was cancelled before completion")]
    Cancelled,
}

/// Top-level error type returned from the public pipeline API.
#[derive(Error, Debug)]
pub enum DeepResearchError {
    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error(transparent)]
    Browser(#[from] BrowserError),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
