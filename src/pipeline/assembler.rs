//! Assembler (spec §4.5): produces the single text payload returned by the
//! pipeline, byte-for-byte matching `original_source/.../utils.py`'s
//! `formatted_output` construction — source blocks, an
//! `AVAILABLE IMAGES FROM SEARCH RESULTS` section, and a trailing
//! `<!-- SEARCH_LOG_JSON ... -->` comment (spec §4.5, §9 design note:
//! "keep the delimiter literal").

use indexmap::IndexMap;

use crate::pipeline::types::{ImageRef, PipelineInput, SearchLog, SummaryOutcome, UniqueResultSet};
use crate::search::{BackendResponse, Query};

const MAX_IMAGES: usize = 20;
const DIAGNOSTIC: &str = "No sources found. Try refining your search queries or broadening the topic.";

/// Builds the final assembled text. `summaries` only contains entries for
/// URLs whose summarization finished (spec §8 invariant 9) — a `unique`
/// entry absent from `summaries` is dropped from the output entirely, which
/// is how cancellation mid-summarization shrinks the emitted block count.
pub fn assemble(
    input: &PipelineInput,
    queries: &[Query],
    responses: &[BackendResponse],
    unique: &UniqueResultSet,
    summaries: &IndexMap<String, SummaryOutcome>,
    images: &[ImageRef],
) -> String {
    let mut blocks = Vec::new();
    let mut processed_count = 0usize;

    for (url, entry) in unique.iter() {
        let Some(outcome) = summaries.get(url) else {
            continue;
        };

        let content = match outcome {
            SummaryOutcome::Produced(summary) => summary.summary.clone(),
            SummaryOutcome::Failed | SummaryOutcome::Skipped => entry.content.clone(),
        };

        processed_count += 1;
        blocks.push(format!(
            "--- SOURCE {n}: {title} ---\nURL: {url}\n\nSUMMARY:\n{content}\n\n{dashes}\n",
            n = processed_count,
            title = entry.title,
            url = url,
            content = content,
            dashes = "-".repeat(80),
        ));
    }

    let mut output = String::new();

    if blocks.is_empty() {
        output.push_str(DIAGNOSTIC);
        output.push('\n');
    } else {
        output.push_str(&blocks.join("\n"));
    }

    if !images.is_empty() {
        output.push('\n');
        output.push_str("AVAILABLE IMAGES FROM SEARCH RESULTS:\n");
        output.push_str(
            "(Embed relevant images in your response using markdown image syntax: ![alt](url))\n",
        );
        for (i, image) in images.iter().take(MAX_IMAGES).enumerate() {
            output.push_str(&format!(
                "{}. {} (from: {}, page: {})\n",
                i + 1,
                image.image_url,
                image.source_title,
                image.source_page_url,
            ));
        }
    }

    let log = SearchLog {
        timestamp: httpdate_now(),
        queries: input.queries.clone(),
        parameters: serde_json::json!({
            "max_results": input.max_results,
            "topic": input.topic,
            "include_raw_content": input.include_raw_content,
        }),
        raw_responses: responses.to_vec(),
        processed_count,
    };
    let _ = queries;

    output.push_str("\n<!-- SEARCH_LOG_JSON\n");
    output.push_str(&serde_json::to_string(&log).unwrap_or_else(|_| "{}".to_string()));
    output.push_str("\n-->\n");

    output
}

/// ISO-8601 timestamp without pulling in a dedicated time-formatting crate
/// beyond `chrono`, which the crate already depends on.
fn httpdate_now() -> String {
    chrono::Utc::now().to_rfc3339()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::types::{Summary, UniqueResult};
    use crate::search::Topic;

    fn input() -> PipelineInput {
        PipelineInput {
            queries: vec!["rust async runtimes".to_string()],
            max_results: 5,
            topic: Topic::General,
            include_raw_content: false,
        }
    }

    #[test]
    fn empty_result_set_emits_diagnostic_and_valid_log() {
        let unique = UniqueResultSet::new();
        let summaries = IndexMap::new();
        let out = assemble(&input(), &[], &[], &unique, &summaries, &[]);

        assert!(out.contains(DIAGNOSTIC));
        assert!(out.contains("SEARCH_LOG_JSON"));

        let json_start = out.find("SEARCH_LOG_JSON").unwrap() + "SEARCH_LOG_JSON".len();
        let json_end = out.find("-->").unwrap();
        let log: serde_json::Value = serde_json::from_str(out[json_start..json_end].trim()).unwrap();
        assert_eq!(log["processed_count"], 0);
    }

    #[test]
    fn search_log_round_trips_queries_and_processed_count() {
        let mut unique = UniqueResultSet::new();
        unique.insert_if_absent(UniqueResult {
            url: "https://a.com".into(),
            title: "A".into(),
            content: "snippet".into(),
            raw_content: None,
            origin_query: "rust async runtimes".into(),
            score: None,
            published_date: None,
        });

        let mut summaries = IndexMap::new();
        summaries.insert(
            "https://a.com".to_string(),
            SummaryOutcome::Produced(Summary {
                summary: "A concise summary.".into(),
                key_excerpts: "key bit".into(),
            }),
        );

        let out = assemble(&input(), &[], &[], &unique, &summaries, &[]);
        assert!(out.contains("--- SOURCE 1: A ---"));
        assert!(out.contains("A concise summary."));

        let json_start = out.find("SEARCH_LOG_JSON").unwrap() + "SEARCH_LOG_JSON".len();
        let json_end = out.find("-->").unwrap();
        let log: serde_json::Value = serde_json::from_str(out[json_start..json_end].trim()).unwrap();
        assert_eq!(log["processed_count"], 1);
        assert_eq!(log["queries"][0], "rust async runtimes");
    }

    #[test]
    fn dropped_entries_absent_from_summaries_are_excluded() {
        let mut unique = UniqueResultSet::new();
        unique.insert_if_absent(UniqueResult {
            url: "https://a.com".into(),
            title: "A".into(),
            content: "snippet a".into(),
            raw_content: None,
            origin_query: "q".into(),
            score: None,
            published_date: None,
        });
        unique.insert_if_absent(UniqueResult {
            url: "https://b.com".into(),
            title: "B".into(),
            content: "snippet b".into(),
            raw_content: None,
            origin_query: "q".into(),
            score: None,
            published_date: None,
        });

        // Only "a" finished before cancellation.
        let mut summaries = IndexMap::new();
        summaries.insert("https://a.com".to_string(), SummaryOutcome::Skipped);

        let out = assemble(&input(), &[], &[], &unique, &summaries, &[]);
        assert!(out.contains("SOURCE 1"));
        assert!(!out.contains("SOURCE 2"));
    }

    #[test]
    fn image_inventory_capped_at_twenty_backend_first() {
        let unique = UniqueResultSet::new();
        let summaries = IndexMap::new();
        let images: Vec<ImageRef> = (0..25)
            .map(|i| ImageRef {
                image_url: format!("https://img/{i}.png"),
                source_title: "t".into(),
                source_page_url: "https://a.com".into(),
            })
            .collect();

        let out = assemble(&input(), &[], &[], &unique, &summaries, &images);
        assert!(out.contains("20. https://img/19.png"));
        assert!(!out.contains("https://img/20.png"));
    }
}
