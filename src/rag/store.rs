//! `MetricsStore` / `VectorStore` / `Embedder` traits (spec §4.7): the crate
//! does not hard-depend on a specific database, following the teacher's
//! "trait at the seam, concrete impl behind it" boundary pattern. The
//! default implementations are `sqlx::PgPool`-backed, ported from
//! `original_source/backend/rag-service/utils/database.py`
//! (`get_metrics_data`, `vector_search_chunks`, `execute_sql`) and
//! `fourthplaces-mntogether`'s `EmbeddingService`/`pgvector` usage.

use async_trait::async_trait;
use pgvector::Vector;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::rag::error::RagError;

/// A single row from the top-level `metrics_data` summary table (spec's
/// Node 1 "fetch structured metrics for the selection").
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct MetricRow {
    pub metric_name: Option<String>,
    pub segment_combo: Option<String>,
    pub value_current: Option<f64>,
    pub value_previous: Option<f64>,
    pub value_delta: Option<f64>,
    pub is_outlier: Option<bool>,
}

/// A row shaped for chart rendering (Node 3). `x_value`/`y_value` are
/// aliased onto the chart-decision's chosen axis columns by the generated
/// SQL (`rag::node3_sql::generate_sql`), so this struct can stay fixed-shape
/// regardless of which metrics-table columns the LLM picked as axes.
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct ChartRow {
    pub x_value: Option<String>,
    pub metric_name: Option<String>,
    pub y_value: Option<f64>,
    pub value_current: Option<f64>,
    pub value_previous: Option<f64>,
    pub value_delta: Option<f64>,
    pub is_outlier: Option<bool>,
    pub outlier_type: Option<String>,
}

/// A retrieved document chunk (spec GLOSSARY: 512 chars / 50-char overlap),
/// ported from `vector_search_chunks`'s `document_chunks` query.
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct DocumentChunk {
    pub source: String,
    pub title: String,
    pub season: String,
    pub week: i32,
    pub chunk_index: i32,
    pub total_chunks: i32,
    pub content: String,
    pub similarity: f64,
}

#[async_trait]
pub trait MetricsStore: Send + Sync {
    async fn get_metrics(&self, title: &str, season: &str, week: i32) -> Result<Vec<MetricRow>, RagError>;

    async fn execute_chart_sql(&self, sql: &str) -> Result<Vec<ChartRow>, RagError>;
}

#[async_trait]
pub trait VectorStore: Send + Sync {
    async fn search_chunks(
        &self,
        embedding: &[f32],
        title: &str,
        season: &str,
        top_k: i64,
    ) -> Result<Vec<DocumentChunk>, RagError>;
}

#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, RagError>;
}

/// Default Postgres-backed implementation of both store traits, sharing one
/// pool (ported from `database.py`'s module-level connection reuse).
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MetricsStore for PgStore {
    async fn get_metrics(&self, title: &str, season: &str, week: i32) -> Result<Vec<MetricRow>, RagError> {
        let rows = sqlx::query_as::<_, MetricRow>(
            "SELECT metric_name, segment_combo, value_current, value_previous, value_delta, is_outlier \
             FROM metrics_data WHERE title = $1 AND season = $2 AND week_number = $3 \
             ORDER BY week_number, contribution_rank_positive NULLS LAST LIMIT 100",
        )
        .bind(title)
        .bind(season)
        .bind(week)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn execute_chart_sql(&self, sql: &str) -> Result<Vec<ChartRow>, RagError> {
        let rows = sqlx::query_as::<_, ChartRow>(sql).fetch_all(&self.pool).await?;
        Ok(rows)
    }
}

#[async_trait]
impl VectorStore for PgStore {
    async fn search_chunks(
        &self,
        embedding: &[f32],
        title: &str,
        season: &str,
        top_k: i64,
    ) -> Result<Vec<DocumentChunk>, RagError> {
        let vector = Vector::from(embedding.to_vec());

        let rows = sqlx::query_as::<_, DocumentChunk>(
            "SELECT source, title, season, week, chunk_index, total_chunks, content, \
             1 - (embedding <=> $1) as similarity \
             FROM document_chunks \
             WHERE embedding IS NOT NULL AND title = $2 AND season = $3 \
             ORDER BY embedding <=> $1 LIMIT $4",
        )
        .bind(vector)
        .bind(title)
        .bind(season)
        .bind(top_k)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}

/// OpenAI `text-embedding-3-small` client, ported from
/// `fourthplaces-mntogether`'s `EmbeddingService`.
pub struct OpenAiEmbedder {
    client: reqwest::Client,
    api_key: String,
    model: String,
}

impl OpenAiEmbedder {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            model: "text-embedding-3-small".to_string(),
        }
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingDatum>,
}

#[derive(Deserialize)]
struct EmbeddingDatum {
    embedding: Vec<f32>,
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, RagError> {
        let response = self
            .client
            .post("https://api.openai.com/v1/embeddings")
            .bearer_auth(&self.api_key)
            .json(&EmbeddingRequest {
                model: &self.model,
                input: text,
            })
            .send()
            .await
            .map_err(|e| RagError::Embedding(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(RagError::Embedding(format!("OpenAI API error {status}: {body}")));
        }

        let parsed: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| RagError::Embedding(e.to_string()))?;

        parsed
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| RagError::Embedding("no embedding returned".to_string()))
    }
}
