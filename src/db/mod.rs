pub mod db_pool;
pub mod executor;
pub mod schema_manager;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    /// Database errors are passed through verbatim
    #[error("{0}")]
    Query(#[from] duckdb::Error),

    #[error("Connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("Failed to convert query results: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("Failed to serialize query results: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Database task execution failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}
