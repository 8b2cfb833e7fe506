use thiserror::Error;

use crate::error::LlmError;

#[derive(Error, Debug)]
pub enum RagError {
    #[error("metrics store query failed: {0}")]
    Store(String),

    #[error("embedding request failed: {0}")]
    Embedding(String),

    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error("sql query failed: {0}")]
    Sql(#[from] sqlx::Error),
}
