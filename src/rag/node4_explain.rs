//! Node 4: Final Explanation (spec §4.7), ported from
//! `node4_explanation.py`. Branches its system prompt on `enable_rag` so a
//! disabled-RAG run is explicitly told not to cite external reports, and
//! resolves the empty-references case to `"No references available."`
//! (Open Question (b), see DESIGN.md).

use crate::llm::client::LlmClient;
use crate::rag::error::RagError;
use crate::rag::state::{RagReference, RagState};
use crate::rag::store::ChartRow;

const RAG_ENABLED_PREAMBLE: &str = "You are a game analytics expert presenting insights to stakeholders.

Create a clear, comprehensive explanation that:
1. Directly answers the user's question
2. Explains the chart visualization
3. Cites specific data points from metrics AND reports
4. Provides actionable insights

Structure your response with:
- ## Summary (2-3 sentences)
- ## Key Findings (bullet points with data)
- ## Chart Interpretation (what the visualization shows)
- ## Recommendations (if applicable)

Keep it concise but informative. Use actual numbers from the data and cite report insights.";

const RAG_DISABLED_PREAMBLE: &str = "You are a game analytics expert presenting insights to stakeholders.

Create a clear, data-driven explanation that:
1. Directly answers the user's question
2. Explains the chart visualization
3. Cites specific data points from metrics ONLY
4. Provides actionable insights

Structure your response with:
- ## Summary (2-3 sentences)
- ## Key Findings (bullet points with data)
- ## Chart Interpretation (what the visualization shows)
- ## Recommendations (if applicable)

Keep it concise but informative. Use actual numbers from the data. Do NOT reference any external reports or documents.";

pub async fn run(state: &mut RagState, llm: &LlmClient) -> Result<(), RagError> {
    let chart_summary = format_chart_summary(&state.sql_result);
    let references_text = if state.enable_rag && !state.rag_references.is_empty() {
        format_references(&state.rag_references)
    } else {
        String::new()
    };

    let (preamble, prompt) = if state.enable_rag {
        (
            RAG_ENABLED_PREAMBLE,
            format!(
                "Question: {}\n\nContext: {} {} Week {}\n\n## Analysis\n{}\n\n## Chart: {} ({:?})\n{}\n\n## Report References\n{}\n\nPlease provide a comprehensive explanation using both metrics data and report insights.",
                state.question, state.title, state.season, state.week, state.analysis, state.chart_title, state.chart_type, chart_summary, references_text
            ),
        )
    } else {
        (
            RAG_DISABLED_PREAMBLE,
            format!(
                "Question: {}\n\nContext: {} {} Week {}\n\n## Analysis\n{}\n\n## Chart: {} ({:?})\n{}\n\nPlease provide a data-driven explanation using ONLY the metrics data shown above. Do NOT mention or cite any reports or external documents.",
                state.question, state.title, state.season, state.week, state.analysis, state.chart_title, state.chart_type, chart_summary
            ),
        )
    };

    let final_explanation = match llm.prompt(preamble, &prompt).await {
        Ok(text) => text,
        Err(e) => format!("Explanation unavailable: {e}"),
    };

    let references = if state.enable_rag && !state.rag_references.is_empty() {
        state
            .rag_references
            .iter()
            .map(|r| format!("{} - {} {} Week {}", r.source, r.title, r.season, r.week))
            .collect()
    } else {
        Vec::new()
    };

    state.final_explanation = final_explanation;
    state.references = references;

    Ok(())
}

fn format_chart_summary(sql_result: &[ChartRow]) -> String {
    if sql_result.is_empty() {
        return "No data available for chart.".to_string();
    }

    let mut lines = Vec::new();
    for (i, row) in sql_result.iter().take(5).enumerate() {
        let segment = row
            .x_value
            .as_deref()
            .map(|s| s.replace('_', " ").replace('=', ": "))
            .unwrap_or_else(|| "Overall".to_string());

        let value = row.value_current.map(|v| format!("{:.1}M", v / 1e6)).unwrap_or_else(|| "-".to_string());
        let delta = row.value_delta.map(|v| format!("{:+.1}M", v / 1e6)).unwrap_or_else(|| "-".to_string());
        let outlier = if row.is_outlier.unwrap_or(false) { "\u{26a0}\u{fe0f}" } else { "" };

        lines.push(format!("{}. {segment}: {value} current ({delta}) {outlier}", i + 1));
    }

    lines.join("\n")
}

fn format_references(rag_references: &[RagReference]) -> String {
    if rag_references.is_empty() {
        return "No references available.".to_string();
    }

    let mut lines = Vec::new();
    for (i, r) in rag_references.iter().enumerate() {
        lines.push(format!("[{}] {}", i + 1, r.source));
        lines.push(format!("    {} {} Week {}", r.title, r.season, r.week));
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_references_render_as_no_references_available() {
        assert_eq!(format_references(&[]), "No references available.");
    }

    #[test]
    fn empty_chart_rows_render_as_no_data_available() {
        assert_eq!(format_chart_summary(&[]), "No data available for chart.");
    }

    #[test]
    fn references_are_numbered_and_include_week() {
        let refs = vec![RagReference {
            source: "report.pdf".to_string(),
            title: "Weekly Report".to_string(),
            season: "Season 3".to_string(),
            week: 5,
            similarity: 0.8,
            chunks_used: 2,
        }];
        let text = format_references(&refs);
        assert!(text.contains("[1] report.pdf"));
        assert!(text.contains("Weekly Report Season 3 Week 5"));
    }
}
