//! Summarizer (spec §4.4): one LLM call per URL with non-empty content,
//! fanned out via `JoinSet`, each wrapped in a 60s timeout. Cancellation
//! truncates the result set to whatever finished before the signal fired
//! (spec §8 invariant 9 / scenario S7) rather than padding unfinished slots
//! with a fallback value.

use std::time::Duration;

use indexmap::IndexMap;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::llm::{Promptable, StructuredOutcome, call_structured};
use crate::pipeline::types::{Summary, SummaryOutcome, UniqueResultSet};

const SUMMARIZE_TIMEOUT: Duration = Duration::from_secs(60);

const SUMMARIZER_PREAMBLE: &str = "You are a research assistant. Summarize the supplied web page content. \
Respond with ONLY a JSON object of the exact shape {\"summary\": string, \"key_excerpts\": string}. \
No prose, no markdown fences.";

/// Runs the summarizer fan-out over every URL in `unique`, returning an
/// `IndexMap` keyed by URL in first-seen order. Cancellation drops entries
/// for URLs whose summarization had not completed; every entry present in
/// the result represents "finished" work, whether that finished as
/// `Produced`, `Failed`, or `Skipped`.
pub async fn summarize_all<C: Promptable + Clone + Send + Sync + 'static>(
    llm: &C,
    unique: &UniqueResultSet,
    max_content_length: usize,
    max_retries: u32,
    cancel: &CancellationToken,
) -> IndexMap<String, SummaryOutcome> {
    let mut set: JoinSet<(usize, String, SummaryOutcome)> = JoinSet::new();

    for (idx, (url, entry)) in unique.iter().enumerate() {
        let url = url.clone();
        let raw_content = entry.raw_content.clone();

        match raw_content {
            None => {
                set.spawn(async move { (idx, url, SummaryOutcome::Skipped) });
            }
            Some(raw) if raw.trim().is_empty() => {
                set.spawn(async move { (idx, url, SummaryOutcome::Skipped) });
            }
            Some(raw) => {
                let llm = llm.clone();
                set.spawn(async move {
                    let outcome = summarize_one(&llm, &raw, max_content_length, max_retries).await;
                    (idx, url, outcome)
                });
            }
        }
    }

    let mut slots: Vec<Option<(String, SummaryOutcome)>> = (0..unique.len()).map(|_| None).collect();

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            joined = set.join_next() => {
                match joined {
                    Some(Ok((idx, url, outcome))) => slots[idx] = Some((url, outcome)),
                    Some(Err(err)) => warn!(error = %err, "summarizer task panicked"),
                    None => break,
                }
            }
        }
    }
    set.abort_all();

    let mut map = IndexMap::new();
    for slot in slots.into_iter().flatten() {
        map.insert(slot.0, slot.1);
    }
    map
}

async fn summarize_one<C: Promptable>(
    llm: &C,
    raw_content: &str,
    max_content_length: usize,
    max_retries: u32,
) -> SummaryOutcome {
    let truncated = truncate_chars(raw_content, max_content_length);
    let today = chrono::Utc::now().format("%Y-%m-%d").to_string();
    let prompt = format!("Current date: {today}\n\nPage content:\n{truncated}");

    let call = call_structured::<_, Summary>(llm, SUMMARIZER_PREAMBLE, &prompt, max_retries);

    match tokio::time::timeout(SUMMARIZE_TIMEOUT, call).await {
        Ok(Ok(StructuredOutcome::Parsed(summary))) => SummaryOutcome::Produced(summary),
        Ok(Ok(StructuredOutcome::FallbackText(text))) => SummaryOutcome::Produced(Summary {
            summary: text,
            key_excerpts: String::new(),
        }),
        Ok(Err(err)) => {
            warn!(error = %err, "summarizer call failed");
            SummaryOutcome::Failed
        }
        Err(_) => {
            warn!("summarizer call timed out after 60s");
            SummaryOutcome::Failed
        }
    }
}

fn truncate_chars(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{LlmError, Provider};
    use crate::llm::Message;
    use crate::pipeline::types::UniqueResult;

    #[test]
    fn truncate_chars_respects_char_boundary_not_byte_count() {
        let s = "日本語のテキスト";
        let truncated = truncate_chars(s, 3);
        assert_eq!(truncated.chars().count(), 3);
    }

    /// Resolves immediately for URLs whose raw content is tagged "FAST";
    /// pends forever (never returns) for URLs tagged "SLOW", so the only way
    /// a "SLOW" task ever finishes is via `set.abort_all()` when
    /// `summarize_all` observes cancellation.
    #[derive(Clone)]
    struct DelayClient;

    #[async_trait::async_trait]
    impl Promptable for DelayClient {
        async fn prompt_history(&self, _preamble: &str, history: &[Message]) -> Result<String, LlmError> {
            let last = history.last().expect("at least one message");
            if last.content.contains("SLOW") {
                std::future::pending::<()>().await;
            }
            Ok("{\"summary\": \"ok\", \"key_excerpts\": \"\"}".to_string())
        }

        fn provider(&self) -> Provider {
            Provider::OpenAi
        }
    }

    fn entry(url: &str, raw_content: &str) -> UniqueResult {
        UniqueResult {
            url: url.to_string(),
            title: url.to_string(),
            content: "snippet".to_string(),
            raw_content: Some(raw_content.to_string()),
            origin_query: "q".to_string(),
            score: None,
            published_date: None,
        }
    }

    /// Drives the real `tokio::select!` race in `summarize_all`: 3 URLs
    /// finish fast, 3 never finish on their own. Cancelling partway through
    /// must yield exactly the 3 finished entries, proving cancellation
    /// truncates the result set rather than padding unfinished slots (spec
    /// §8 invariant 9 / scenario S7).
    #[tokio::test]
    async fn cancellation_mid_run_keeps_only_already_finished_entries() {
        let mut unique = UniqueResultSet::new();
        for i in 0..3 {
            unique.insert_if_absent(entry(&format!("https://fast.example/{i}"), "FAST content"));
        }
        for i in 0..3 {
            unique.insert_if_absent(entry(&format!("https://slow.example/{i}"), "SLOW content"));
        }

        let cancel = CancellationToken::new();
        let cancel_for_trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            cancel_for_trigger.cancel();
        });

        let summaries = summarize_all(&DelayClient, &unique, 4000, 0, &cancel).await;

        assert_eq!(summaries.len(), 3);
        for i in 0..3 {
            let key = format!("https://fast.example/{i}");
            assert!(matches!(summaries.get(&key), Some(SummaryOutcome::Produced(_))));
        }
    }
}
