//! Structured-output coercion with bounded retries (spec §4.4, §9), plus
//! the context-overflow recovery path required by spec §4.8: when a call is
//! classified as a context-length overflow, the history is stripped back to
//! just before the last assistant message and the call is retried (spec
//! scenario S4).
//!
//! rig-core 0.9 has no built-in `with_structured_output` equivalent (see the
//! header note in `fourthplaces-mntogether`'s `agentic_extraction.rs`
//! explaining why that repo also avoids depending on one), so this follows
//! `ai_effects.rs::NeedExtractor::extract_needs`'s pattern instead: instruct
//! the model to return bare JSON in the prompt, then `serde_json::from_str`
//! the response, retrying on parse failure up to a configured budget.

use serde::de::DeserializeOwned;
use tracing::warn;

use crate::error::{LlmError, Provider};
use crate::llm::token_limit::{Message, is_token_limit_exceeded, remove_up_to_last_assistant};

/// Anything that can take a rendered message history and produce a raw text
/// response. `LlmClient` implements this; tests implement it with a fake to
/// exercise the overflow-recovery loop without a live network call.
#[async_trait::async_trait]
pub trait Promptable: Send + Sync {
    async fn prompt_history(&self, preamble: &str, history: &[Message]) -> Result<String, LlmError>;
    fn provider(&self) -> Provider;
}

pub enum StructuredOutcome<T> {
    Parsed(T),
    FallbackText(String),
}

/// How many times a single logical attempt will trim-and-retry after a
/// context-overflow classification before giving up and propagating the
/// error. Bounded separately from `max_retries` (the parse-failure budget)
/// since trimming the same two-message history repeatedly converges fast.
const MAX_OVERFLOW_RECOVERY_ATTEMPTS: u32 = 3;

/// Calls `client.prompt_history()` and attempts to parse the response as
/// `T`, retrying up to `max_retries` times on parse failure. Each retry
/// appends the prior (unparseable) response and a correction nudge to the
/// conversation history, so a long enough retry run can itself overflow the
/// model's context; when that happens the history is trimmed back to just
/// before the last assistant turn and the same logical attempt is retried
/// (spec §4.8, §9). If every attempt fails to parse, returns the last raw
/// response text as a fallback rather than propagating an error — the
/// mandatory string-fallback path from spec §9.
pub async fn call_structured<C: Promptable, T: DeserializeOwned>(
    client: &C,
    preamble: &str,
    prompt: &str,
    max_retries: u32,
) -> Result<StructuredOutcome<T>, LlmError> {
    let mut history = vec![Message::user(prompt)];
    let mut last_raw = String::new();
    let mut last_error = String::new();

    for attempt in 0..=max_retries {
        let raw = call_with_overflow_recovery(client, preamble, &mut history).await?;
        last_raw = raw.clone();
        history.push(Message::assistant(raw.clone()));

        match parse_json_response::<T>(&raw) {
            Ok(value) => return Ok(StructuredOutcome::Parsed(value)),
            Err(err) => {
                warn!(attempt, error = %err, "structured output failed to parse, retrying");
                last_error = err;
                history.push(Message::user(
                    "That response was not valid JSON matching the required shape. \
                     Respond again with ONLY the JSON object, no prose, no markdown fences.",
                ));
            }
        }
    }

    warn!(
        attempts = max_retries + 1,
        error = %last_error,
        "structured output exhausted retries, falling back to raw text"
    );
    Ok(StructuredOutcome::FallbackText(last_raw))
}

/// Issues one `prompt_history` call, classifying any error as a
/// context-length overflow (`is_token_limit_exceeded`) and, if so, trimming
/// `history` in place via `remove_up_to_last_assistant` and retrying — up
/// to `MAX_OVERFLOW_RECOVERY_ATTEMPTS` times, or until trimming no longer
/// shrinks the history (nothing left to strip), at which point the error is
/// propagated rather than looping forever. Non-overflow errors propagate
/// immediately without retrying.
async fn call_with_overflow_recovery<C: Promptable>(
    client: &C,
    preamble: &str,
    history: &mut Vec<Message>,
) -> Result<String, LlmError> {
    for _ in 0..=MAX_OVERFLOW_RECOVERY_ATTEMPTS {
        match client.prompt_history(preamble, history).await {
            Ok(raw) => return Ok(raw),
            Err(err) if is_token_limit_exceeded(&err) => {
                warn!(
                    error = %err,
                    "context length exceeded, stripping history back before last assistant turn and retrying"
                );
                let trimmed = remove_up_to_last_assistant(history);
                if trimmed.len() == history.len() {
                    return Err(err);
                }
                *history = trimmed;
            }
            Err(err) => return Err(err),
        }
    }

    Err(LlmError::RequestFailed {
        provider: client.provider(),
        message: "exhausted context-overflow recovery attempts".to_string(),
    })
}

/// Strips a surrounding ```json fenced block if present, then parses.
fn parse_json_response<T: DeserializeOwned>(raw: &str) -> Result<T, String> {
    let trimmed = raw.trim();
    let unfenced = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed)
        .strip_suffix("```")
        .unwrap_or(trimmed)
        .trim();

    serde_json::from_str(unfenced).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::sync::Mutex;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Sample {
        summary: String,
    }

    #[test]
    fn parses_fenced_json() {
        let raw = "```json\n{\"summary\": \"hello\"}\n```";
        let parsed: Sample = parse_json_response(raw).unwrap();
        assert_eq!(
            parsed,
            Sample {
                summary: "hello".to_string()
            }
        );
    }

    #[test]
    fn parses_bare_json() {
        let raw = "{\"summary\": \"hello\"}";
        let parsed: Sample = parse_json_response(raw).unwrap();
        assert_eq!(
            parsed,
            Sample {
                summary: "hello".to_string()
            }
        );
    }

    /// Returns canned responses in order; records the history length seen
    /// on each call so tests can assert the trim actually happened.
    struct FakeClient {
        responses: Mutex<Vec<Result<String, LlmError>>>,
        seen_history_lens: Mutex<Vec<usize>>,
    }

    impl FakeClient {
        fn new(responses: Vec<Result<String, LlmError>>) -> Self {
            Self {
                responses: Mutex::new(responses),
                seen_history_lens: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait::async_trait]
    impl Promptable for FakeClient {
        async fn prompt_history(&self, _preamble: &str, history: &[Message]) -> Result<String, LlmError> {
            self.seen_history_lens.lock().unwrap().push(history.len());
            let mut responses = self.responses.lock().unwrap();
            if responses.is_empty() {
                panic!("FakeClient exhausted its canned responses");
            }
            responses.remove(0)
        }

        fn provider(&self) -> Provider {
            Provider::OpenAi
        }
    }

    /// With no assistant turn yet in history (the very first call),
    /// trimming is a no-op, so an overflow classification propagates
    /// immediately rather than looping on an unchanged history.
    #[tokio::test]
    async fn context_overflow_with_no_assistant_turn_to_trim_propagates() {
        let client = FakeClient::new(vec![Err(LlmError::RequestFailed {
            provider: Provider::OpenAi,
            message: "context_length_exceeded: reduce the length of the messages".to_string(),
        })]);

        let result = call_structured::<_, Sample>(&client, "preamble", "prompt", 0).await;
        assert!(result.is_err());

        let lens = client.seen_history_lens.lock().unwrap();
        assert_eq!(*lens, vec![1]);
    }

    /// A non-overflow error propagates immediately without retrying.
    #[tokio::test]
    async fn non_overflow_error_propagates_without_retry() {
        let client = FakeClient::new(vec![Err(LlmError::RequestFailed {
            provider: Provider::OpenAi,
            message: "rate limited, try again later".to_string(),
        })]);

        let result = call_structured::<_, Sample>(&client, "preamble", "prompt", 2).await;
        assert!(result.is_err());
    }

    /// Overflow during a later retry (once history has an assistant turn in
    /// it) trims back to before that turn and the next attempt succeeds.
    #[tokio::test]
    async fn overflow_after_a_failed_parse_trims_the_assistant_turn() {
        let client = FakeClient::new(vec![
            Ok("not json".to_string()),
            Err(LlmError::RequestFailed {
                provider: Provider::OpenAi,
                message: "context_length_exceeded".to_string(),
            }),
            Ok("{\"summary\": \"ok\"}".to_string()),
        ]);

        let outcome = call_structured::<_, Sample>(&client, "preamble", "prompt", 1)
            .await
            .unwrap();

        match outcome {
            StructuredOutcome::Parsed(sample) => assert_eq!(sample.summary, "ok"),
            StructuredOutcome::FallbackText(text) => panic!("expected parsed outcome, got fallback: {text}"),
        }

        let lens = client.seen_history_lens.lock().unwrap();
        // call 1: [User] len 1
        // call 2 (parse failed, appended Assistant+User nudge): len 3, then overflow
        // call 3 (trimmed back to before the Assistant turn): len 1
        assert_eq!(*lens, vec![1, 3, 1]);
    }
}
