//! `RagWorkflow` (spec §4.7): a fixed four-stage pipeline over one
//! `RagState`, ported from the original's LangGraph-style node chain. The
//! original builds a graph purely to run its nodes in a straight line with
//! no branching or cycles, so this follows the teacher's plainer style
//! instead of pulling in a graph-execution crate for it: four ordinary
//! async calls in sequence.

use sqlx::PgPool;

use crate::rag::config::RagConfig;
use crate::rag::error::RagError;
use crate::rag::state::RagState;
use crate::rag::store::{Embedder, MetricsStore, OpenAiEmbedder, PgStore, VectorStore};
use crate::rag::{node1_retrieve, node2_chart, node3_sql, node4_explain};

pub struct RagWorkflow<M, E> {
    store: M,
    embedder: E,
    config: RagConfig,
}

impl RagWorkflow<PgStore, OpenAiEmbedder> {
    pub async fn connect(config: RagConfig) -> Result<Self, RagError> {
        let pool = PgPool::connect(&config.database_url)
            .await
            .map_err(|e| RagError::Store(e.to_string()))?;
        let embedder = OpenAiEmbedder::new(config.openai_api_key.clone());
        Ok(Self {
            store: PgStore::new(pool),
            embedder,
            config,
        })
    }
}

impl<M, E> RagWorkflow<M, E>
where
    M: MetricsStore + VectorStore,
    E: Embedder,
{
    pub fn new(store: M, embedder: E, config: RagConfig) -> Self {
        Self { store, embedder, config }
    }

    pub async fn run(&self, question: impl Into<String>, title: impl Into<String>, season: impl Into<String>, week: i32, enable_rag: bool) -> Result<RagState, RagError> {
        let mut state = RagState::new(question, title, season, week, enable_rag);
        let llm = self.config.llm_client();
        let max_retries = self.config.max_structured_output_retries;

        node1_retrieve::run(&mut state, &self.store, &self.store, &self.embedder, &llm, max_retries).await?;
        node2_chart::run(&mut state, &llm, max_retries).await?;
        node3_sql::run(&mut state, &self.store).await?;
        node4_explain::run(&mut state, &llm).await?;

        Ok(state)
    }
}
