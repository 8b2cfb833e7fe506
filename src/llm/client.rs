//! Thin wrapper over `rig-core` providers, grounded in
//! `fourthplaces-mntogether/packages/server/src/kernel/ai.rs`'s
//! `ClaudeClient`/`BaseAI` pattern: build one agent per call with a preamble
//! and a max-token budget, then `.prompt(text).await`.
//!
//! Carries an explicit message-history concept (`token_limit::Message`) so
//! the context-overflow recovery in `structured.rs` (spec §4.8) has
//! something to trim: `prompt_history` flattens a `[Message]` into the
//! single prompt string rig-core's `Prompt::prompt` accepts, which keeps the
//! retry-with-shorter-history loop meaningful without depending on a
//! rig-core chat-history API this pack doesn't demonstrate.

use rig::completion::Prompt;
use rig::providers::{anthropic, openai};

use crate::error::{LlmError, Provider};
use crate::llm::token_limit::Message;

/// Which rig-core provider backs a given `LlmClient`.
#[derive(Clone)]
pub enum Backend {
    OpenAi(openai::Client),
    Anthropic(anthropic::Client),
}

#[derive(Clone)]
pub struct LlmClient {
    backend: Backend,
    model: String,
    max_tokens: u64,
}

impl LlmClient {
    pub fn openai(api_key: &str, model: impl Into<String>, max_tokens: u64) -> Self {
        Self {
            backend: Backend::OpenAi(openai::Client::new(api_key)),
            model: model.into(),
            max_tokens,
        }
    }

    pub fn anthropic(api_key: &str, model: impl Into<String>, max_tokens: u64) -> Self {
        Self {
            backend: Backend::Anthropic(anthropic::ClientBuilder::new(api_key).build()),
            model: model.into(),
            max_tokens,
        }
    }

    pub fn provider(&self) -> Provider {
        match self.backend {
            Backend::OpenAi(_) => Provider::OpenAi,
            Backend::Anthropic(_) => Provider::Anthropic,
        }
    }

    /// Issues one prompt against the configured model, returning the raw
    /// text response. Callers that need a typed shape go through
    /// `llm::structured::call_structured` instead.
    pub async fn prompt(&self, preamble: &str, prompt: &str) -> Result<String, LlmError> {
        let provider = self.provider();

        match &self.backend {
            Backend::OpenAi(client) => {
                let agent = client
                    .agent(&self.model)
                    .preamble(preamble)
                    .max_tokens(self.max_tokens)
                    .build();
                agent
                    .prompt(prompt)
                    .await
                    .map_err(|e| LlmError::RequestFailed {
                        provider,
                        message: e.to_string(),
                    })
            }
            Backend::Anthropic(client) => {
                let agent = client
                    .agent(&self.model)
                    .preamble(preamble)
                    .max_tokens(self.max_tokens)
                    .build();
                agent
                    .prompt(prompt)
                    .await
                    .map_err(|e| LlmError::RequestFailed {
                        provider,
                        message: e.to_string(),
                    })
            }
        }
    }

    /// Same as `prompt`, but takes a message history instead of a bare
    /// string. rig-core 0.9's `Prompt::prompt` only takes a single text
    /// argument (no chat-history parameter is demonstrated anywhere in the
    /// pack), so the history is flattened into one rendered block before
    /// being sent; shrinking `history` (see `token_limit::
    /// remove_up_to_last_assistant`) and calling this again produces a
    /// strictly shorter rendered prompt, which is what the context-overflow
    /// recovery loop in `structured.rs` relies on.
    pub async fn prompt_history(&self, preamble: &str, history: &[Message]) -> Result<String, LlmError> {
        self.prompt(preamble, &render_history(history)).await
    }
}

#[async_trait::async_trait]
impl crate::llm::structured::Promptable for LlmClient {
    async fn prompt_history(&self, preamble: &str, history: &[Message]) -> Result<String, LlmError> {
        LlmClient::prompt_history(self, preamble, history).await
    }

    fn provider(&self) -> Provider {
        LlmClient::provider(self)
    }
}

fn render_history(history: &[Message]) -> String {
    history
        .iter()
        .map(|m| format!("{}: {}", m.role.label(), m.content))
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::token_limit::Role;

    #[test]
    fn render_history_labels_each_turn() {
        let history = vec![
            Message {
                role: Role::User,
                content: "hi".into(),
            },
            Message {
                role: Role::Assistant,
                content: "hello".into(),
            },
        ];
        let rendered = render_history(&history);
        assert_eq!(rendered, "User: hi\n\nAssistant: hello");
    }
}
