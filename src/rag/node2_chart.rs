//! Node 2: Chart Decision (spec §4.7), ported from `node2_chart_decision.py`.
//! Asks the LLM to pick a chart shape and axes; on any parse failure it
//! falls back to the same hardcoded bar-chart default the original used,
//! rather than the generic `FallbackText` raw-string path, since a chart
//! decision has no sensible raw-text representation.

use serde::Deserialize;

use crate::llm::client::LlmClient;
use crate::llm::structured::{call_structured, StructuredOutcome};
use crate::rag::error::RagError;
use crate::rag::state::{ChartType, RagState};

const CHART_DECISION_PREAMBLE: &str = "You are a data visualization expert. Based on the user's \
question and analysis, decide the best chart type and configuration.

Available chart types:
- bar: For comparing categories (segments, modes)
- line: For trends over time
- pie: For showing proportions
- scatter: For correlations

Available metrics in the database:
- br_hours: BR mode play hours
- dau: Daily Active Users
- mp_hours: Multiplayer hours

Available segments:
- mode_main: BR Main, Resurgence, Plunder
- premium_label: Premium, F2P
- spending_segment: Whales, Dolphins, Minnows

Respond in JSON format:
{
    \"chart_type\": \"bar|line|pie|scatter\",
    \"chart_title\": \"Title for the chart\",
    \"x_axis\": \"field name for x-axis\",
    \"y_axis\": \"field name for y-axis (usually value_current or contribution_value)\",
    \"filter_sql\": \"SQL WHERE clause for filtering data (e.g., 'is_outlier = true')\"
}";

#[derive(Debug, Deserialize)]
struct ChartDecision {
    chart_type: String,
    chart_title: String,
    x_axis: String,
    y_axis: String,
    #[serde(default)]
    filter_sql: String,
}

fn default_decision(season: &str, week: i32) -> ChartDecision {
    ChartDecision {
        chart_type: "bar".to_string(),
        chart_title: format!("Top Contributors - {season} Week {week}"),
        x_axis: "segment_combo".to_string(),
        y_axis: "contribution_value".to_string(),
        filter_sql: "is_outlier = true".to_string(),
    }
}

pub async fn run(state: &mut RagState, llm: &LlmClient, max_retries: u32) -> Result<(), RagError> {
    let prompt = format!(
        "Question: {}\n\nAnalysis: {}\n\nKey metrics: {:?}\nKey segments: {:?}\n\nContext: {} {} Week {}\n\nWhat chart should we show?",
        state.question, state.analysis, state.key_metrics, state.key_segments, state.title, state.season, state.week
    );

    let outcome = call_structured::<_, ChartDecision>(llm, CHART_DECISION_PREAMBLE, &prompt, max_retries).await?;

    let decision = match outcome {
        StructuredOutcome::Parsed(d) => d,
        StructuredOutcome::FallbackText(_) => default_decision(&state.season, state.week),
    };

    state.chart_type = parse_chart_type(&decision.chart_type);
    state.chart_title = decision.chart_title;
    state.x_axis = decision.x_axis;
    state.y_axis = decision.y_axis;
    state.chart_filter = decision.filter_sql;

    Ok(())
}

fn parse_chart_type(raw: &str) -> ChartType {
    match raw {
        "line" => ChartType::Line,
        "pie" => ChartType::Pie,
        "scatter" => ChartType::Scatter,
        _ => ChartType::Bar,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_chart_type_string_defaults_to_bar() {
        assert_eq!(parse_chart_type("pareto"), ChartType::Bar);
        assert_eq!(parse_chart_type("pie"), ChartType::Pie);
    }

    #[test]
    fn default_decision_matches_hardcoded_fallback() {
        let d = default_decision("Season 3", 5);
        assert_eq!(d.chart_type, "bar");
        assert_eq!(d.chart_title, "Top Contributors - Season 3 Week 5");
        assert_eq!(d.filter_sql, "is_outlier = true");
    }
}
