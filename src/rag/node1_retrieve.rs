//! Node 1: Retrieve + Analyze (spec §4.7), ported from
//! `node1_rag_analysis.py`. Fetches structured metrics, runs a chunk-based
//! pgvector similarity search when RAG is enabled, and asks the LLM for a
//! structured `{key_metrics, key_segments}` read plus a free-text analysis.

use serde::Deserialize;

use crate::error::LlmError;
use crate::llm::client::LlmClient;
use crate::llm::structured::{call_structured, StructuredOutcome};
use crate::rag::error::RagError;
use crate::rag::state::{RagReference, RagState};
use crate::rag::store::{DocumentChunk, Embedder, MetricRow, MetricsStore, VectorStore};

const TOP_K_RESULTS: i64 = 5;

#[derive(Debug, Deserialize, Default)]
struct QuestionAnalysis {
    #[serde(default)]
    key_metrics: Vec<String>,
    #[serde(default)]
    key_segments: Vec<String>,
}

const ANALYSIS_JSON_PREAMBLE: &str = "You are a game analytics expert. Extract the key metrics and \
segments relevant to the user's question. Respond with bare JSON only: \
{\"key_metrics\": [...], \"key_segments\": [...]}";

const NARRATIVE_PREAMBLE: &str = "You are a game analytics expert. Analyze the user's question using \
the provided data and reports.

Provide a clear, structured analysis that:
1. Directly answers the question
2. Cites specific data points from the metrics
3. References report insights (if RAG is enabled)
4. Identifies key drivers and patterns

Keep the response concise but comprehensive.";

pub async fn run<M, V, E>(
    state: &mut RagState,
    metrics_store: &M,
    vector_store: &V,
    embedder: &E,
    llm: &LlmClient,
    max_retries: u32,
) -> Result<(), RagError>
where
    M: MetricsStore,
    V: VectorStore,
    E: Embedder,
{
    let metrics = metrics_store
        .get_metrics(&state.title, &state.season, state.week)
        .await?;
    let metrics_context = format_metrics_context(&metrics);

    let (rag_context, rag_references) = if state.enable_rag {
        let embedding = embedder.embed(&state.question).await?;
        let chunks = vector_store
            .search_chunks(&embedding, &state.title, &state.season, TOP_K_RESULTS * 2)
            .await?;
        build_rag_context(&chunks)
    } else {
        (String::new(), Vec::new())
    };

    let rag_section = if state.enable_rag {
        rag_context.as_str()
    } else {
        "(RAG disabled)"
    };

    let analysis_prompt = format!(
        "Question: {}\n\n## Metrics Data\n{}\n\n## Report Context\n{}\n\nPlease analyze and answer the question.",
        state.question, metrics_context, rag_section
    );

    let analysis_result =
        call_structured::<_, QuestionAnalysis>(llm, ANALYSIS_JSON_PREAMBLE, &analysis_prompt, max_retries)
            .await?;
    let (key_metrics, key_segments) = match analysis_result {
        StructuredOutcome::Parsed(a) => (a.key_metrics, a.key_segments),
        StructuredOutcome::FallbackText(_) => (Vec::new(), Vec::new()),
    };

    let analysis = llm
        .prompt(NARRATIVE_PREAMBLE, &analysis_prompt)
        .await
        .map_err(RagError::from)
        .or_else(|e| match e {
            RagError::Llm(LlmError::RequestFailed { message, .. }) => {
                Ok(format!("Analysis unavailable: {message}"))
            }
            other => Err(other),
        })?;

    state.analysis = analysis;
    state.key_metrics = key_metrics;
    state.key_segments = key_segments;
    state.rag_references = rag_references;
    state.rag_context = rag_context;

    Ok(())
}

fn format_metrics_context(metrics: &[MetricRow]) -> String {
    if metrics.is_empty() {
        return "No metrics data available.".to_string();
    }

    let mut lines = vec![
        "| Metric | Segment | Current | Previous | Delta | Outlier |".to_string(),
        "|--------|---------|---------|----------|-------|---------|".to_string(),
    ];

    for m in metrics.iter().take(20) {
        let segment = m.segment_combo.clone().unwrap_or_else(|| "Overall".to_string());
        let current = m.value_current.map(|v| format!("{:.1}M", v / 1e6)).unwrap_or_else(|| "-".to_string());
        let previous = m.value_previous.map(|v| format!("{:.1}M", v / 1e6)).unwrap_or_else(|| "-".to_string());
        let delta = m.value_delta.map(|v| format!("{:+.1}M", v / 1e6)).unwrap_or_else(|| "-".to_string());
        let outlier = if m.is_outlier.unwrap_or(false) { "\u{2713}" } else { "" };
        let metric_name = m.metric_name.clone().unwrap_or_else(|| "-".to_string());

        lines.push(format!(
            "| {metric_name} | {segment} | {current} | {previous} | {delta} | {outlier} |"
        ));
    }

    lines.join("\n")
}

/// Builds the report-context string and the deduplicated reference list,
/// tracking `chunks_used` per document the same way `seen_docs` does in
/// the original.
fn build_rag_context(chunks: &[DocumentChunk]) -> (String, Vec<RagReference>) {
    let mut context = String::new();
    let mut references: Vec<RagReference> = Vec::new();

    for chunk in chunks {
        context.push_str(&format!(
            "\n\n--- [{}] {} {} Week {} (chunk {}/{}, similarity: {:.2}) ---\n{}",
            chunk.source,
            chunk.title,
            chunk.season,
            chunk.week,
            chunk.chunk_index,
            chunk.total_chunks,
            chunk.similarity,
            chunk.content
        ));

        let existing = references.iter_mut().find(|r| {
            r.source == chunk.source
                && r.title == chunk.title
                && r.season == chunk.season
                && r.week == chunk.week
        });

        match existing {
            Some(r) => r.chunks_used += 1,
            None => references.push(RagReference {
                source: chunk.source.clone(),
                title: chunk.title.clone(),
                season: chunk.season.clone(),
                week: chunk.week,
                similarity: chunk.similarity,
                chunks_used: 1,
            }),
        }
    }

    (context, references)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(source: &str, title: &str, week: i32, idx: i32) -> DocumentChunk {
        DocumentChunk {
            source: source.to_string(),
            title: title.to_string(),
            season: "Season 3".to_string(),
            week,
            chunk_index: idx,
            total_chunks: 2,
            content: "content".to_string(),
            similarity: 0.9,
        }
    }

    #[test]
    fn dedupes_chunks_from_the_same_document_counting_chunks_used() {
        let chunks = vec![
            chunk("report.pdf", "Weekly Report", 3, 0),
            chunk("report.pdf", "Weekly Report", 3, 1),
            chunk("other.pdf", "Other Report", 3, 0),
        ];

        let (_, refs) = build_rag_context(&chunks);
        assert_eq!(refs.len(), 2);
        assert_eq!(refs[0].chunks_used, 2);
        assert_eq!(refs[1].chunks_used, 1);
    }

    #[test]
    fn empty_metrics_produces_placeholder_text() {
        assert_eq!(format_metrics_context(&[]), "No metrics data available.");
    }
}
