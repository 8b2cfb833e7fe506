//! `RagState` (spec §4.7): the single mutable record threaded through the
//! four-node workflow, ported from
//! `original_source/backend/rag-service/state.py::WorkflowState`.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartType {
    Bar,
    Line,
    Pie,
    Scatter,
}

impl Default for ChartType {
    fn default() -> Self {
        ChartType::Bar
    }
}

/// One retrieved document chunk's owning document, deduplicated across
/// chunks with a running `chunks_used` counter (ported from
/// `node1_rag_analysis.py`'s `seen_docs` bookkeeping).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagReference {
    pub source: String,
    pub title: String,
    pub season: String,
    pub week: i32,
    pub similarity: f64,
    pub chunks_used: u32,
}

#[derive(Debug, Clone, Default)]
pub struct RagState {
    // --- Input ---
    pub question: String,
    pub title: String,
    pub season: String,
    pub week: i32,
    pub enable_rag: bool,

    // --- Node 1 output ---
    pub analysis: String,
    pub key_metrics: Vec<String>,
    pub key_segments: Vec<String>,
    pub rag_references: Vec<RagReference>,
    pub rag_context: String,

    // --- Node 2 output ---
    pub chart_type: ChartType,
    pub chart_title: String,
    pub x_axis: String,
    pub y_axis: String,
    pub chart_filter: String,

    // --- Node 3 output ---
    pub sql_query: String,
    pub sql_result: Vec<crate::rag::store::ChartRow>,
    pub chart_config: serde_json::Value,
    pub python_code: String,

    // --- Node 4 output ---
    pub final_explanation: String,
    pub references: Vec<String>,
}

impl RagState {
    pub fn new(question: impl Into<String>, title: impl Into<String>, season: impl Into<String>, week: i32, enable_rag: bool) -> Self {
        Self {
            question: question.into(),
            title: title.into(),
            season: season.into(),
            week,
            enable_rag,
            chart_type: ChartType::Bar,
            ..Default::default()
        }
    }
}
