//! RAG Workflow (spec §4.7): retrieve-and-analyze, chart-decide, SQL-and-
//! visualize, and explain, over pgvector-backed document chunks and a
//! structured metrics table. Treated by the rest of the crate as an
//! optional collaborator module, not a dependency of the search pipeline.

mod config;
mod error;
mod node1_retrieve;
mod node2_chart;
mod node3_sql;
mod node4_explain;
mod state;
mod store;
mod workflow;

pub use config::RagConfig;
pub use error::RagError;
pub use state::{ChartType, RagReference, RagState};
pub use store::{ChartRow, DocumentChunk, Embedder, MetricRow, MetricsStore, OpenAiEmbedder, PgStore, VectorStore};
pub use workflow::RagWorkflow;
