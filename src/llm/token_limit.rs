//! Token-limit-aware recovery (spec §4.8), ported from
//! `examples/original_source/open_deep_research-main/.../utils.py`'s
//! `is_token_limit_exceeded`, `_check_{openai,anthropic,gemini}_token_limit`,
//! `MODEL_TOKEN_LIMITS`, and `remove_up_to_last_ai_message`.
//!
//! Rust has no introspectable exception classes, so classification here
//! matches on the explicit `Provider` tag the call site attaches to an
//! `LlmError` plus keyword matching against its raw message string — the
//! same "preserve class name and module as strings" contract the Python
//! source followed, restated without runtime reflection (spec §9).

use crate::error::{LlmError, Provider};

const OPENAI_KEYWORDS: &[&str] = &["token", "context", "length", "maximum context", "reduce"];
const ANTHROPIC_PHRASE: &str = "prompt is too long";
const GEMINI_KEYWORDS: &[&str] = &["resourceexhausted", "quota", "token"];

/// Classifies whether an `LlmError` represents a context-length overflow.
pub fn is_token_limit_exceeded(error: &LlmError) -> bool {
    let message = error.raw_message().to_lowercase();

    match error.provider() {
        Provider::OpenAi => check_openai(&message),
        Provider::Anthropic => check_anthropic(&message),
        Provider::Gemini => check_gemini(&message),
        Provider::Unknown => check_openai(&message) || check_anthropic(&message) || check_gemini(&message),
    }
}

fn check_openai(message: &str) -> bool {
    message.contains("context_length_exceeded")
        || message.contains("invalid_request_error")
        || OPENAI_KEYWORDS.iter().any(|kw| message.contains(kw))
}

fn check_anthropic(message: &str) -> bool {
    message.contains(ANTHROPIC_PHRASE)
}

fn check_gemini(message: &str) -> bool {
    GEMINI_KEYWORDS.iter().any(|kw| message.contains(kw))
}

/// Static table mapping known model ids to context budgets, ported verbatim
/// from `MODEL_TOKEN_LIMITS` to inform pre-flight trimming decisions.
const MODEL_TOKEN_LIMITS: &[(&str, u64)] = &[
    ("openai:gpt-4.1-mini", 1_047_576),
    ("openai:gpt-4o", 128_000),
    ("openai:o3", 200_000),
    ("anthropic:claude-opus-4", 200_000),
    ("anthropic:claude-3-5-sonnet", 200_000),
    ("google:gemini-1.5-pro", 2_097_152),
    ("cohere:command-r-plus", 128_000),
    ("mistral:mistral-large", 32_768),
    ("ollama:llama2", 4_096),
    (
        "bedrock:us.anthropic.claude-sonnet-4-20250514-v1:0",
        200_000,
    ),
];

/// Looks up a model's context budget via substring match, mirroring
/// `get_model_token_limit()`.
pub fn model_token_limit(model_id: &str) -> Option<u64> {
    MODEL_TOKEN_LIMITS
        .iter()
        .find(|(key, _)| model_id.contains(key))
        .map(|(_, limit)| *limit)
}

/// A minimal chat message record, just enough to locate the last assistant
/// turn — the pipeline's own message history type carries richer fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
    System,
}

impl Role {
    pub fn label(&self) -> &'static str {
        match self {
            Role::User => "User",
            Role::Assistant => "Assistant",
            Role::System => "System",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Ported from `remove_up_to_last_ai_message`: searches backwards for the
/// last assistant message and returns everything before it. If no assistant
/// message is found, the original history is returned unchanged.
pub fn remove_up_to_last_assistant(messages: &[Message]) -> Vec<Message> {
    match messages.iter().rposition(|m| m.role == Role::Assistant) {
        Some(idx) => messages[..idx].to_vec(),
        None => messages.to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openai_context_length_keyword_is_detected() {
        let err = LlmError::RequestFailed {
            provider: Provider::OpenAi,
            message: "Error code: 400 - context_length_exceeded: reduce the length".to_string(),
        };
        assert!(is_token_limit_exceeded(&err));
    }

    #[test]
    fn anthropic_requires_exact_phrase() {
        let matching = LlmError::RequestFailed {
            provider: Provider::Anthropic,
            message: "prompt is too long: 250000 tokens > 200000 maximum".to_string(),
        };
        let non_matching = LlmError::RequestFailed {
            provider: Provider::Anthropic,
            message: "rate limited, try again later".to_string(),
        };
        assert!(is_token_limit_exceeded(&matching));
        assert!(!is_token_limit_exceeded(&non_matching));
    }

    #[test]
    fn model_token_limit_substring_match() {
        assert_eq!(model_token_limit("openai:gpt-3.5-turbo"), None);
        assert_eq!(model_token_limit("openai:gpt-4o"), Some(128_000));
    }

    #[test]
    fn strips_history_back_to_before_last_assistant_message() {
        let messages = vec![
            Message {
                role: Role::User,
                content: "hi".into(),
            },
            Message {
                role: Role::Assistant,
                content: "hello".into(),
            },
            Message {
                role: Role::User,
                content: "continue".into(),
            },
        ];
        let trimmed = remove_up_to_last_assistant(&messages);
        assert_eq!(trimmed.len(), 1);
        assert_eq!(trimmed[0].content, "hi");
    }

    #[test]
    fn no_assistant_message_returns_unchanged() {
        let messages = vec![Message {
            role: Role::User,
            content: "hi".into(),
        }];
        let trimmed = remove_up_to_last_assistant(&messages);
        assert_eq!(trimmed.len(), 1);
    }
}
