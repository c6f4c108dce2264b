use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;
use tracing::error;

use crate::db::DbError;
use crate::llm::LlmError;

/// Failures surfaced by the HTTP handlers
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Upstream(LlmError),

    #[error("Failed to generate SQL")]
    EmptyGeneration,

    #[error("{0}")]
    QueryExecution(#[from] DbError),

    #[error("Schema load failed: {0}")]
    SchemaLoad(DbError),
}

impl From<LlmError> for AppError {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::EmptyGeneration => AppError::EmptyGeneration,
            other => AppError::Upstream(other),
        }
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Upstream(_)
            | AppError::EmptyGeneration
            | AppError::QueryExecution(_)
            | AppError::SchemaLoad(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.to_string();

        if status.is_server_error() {
            error!("Request failed: {}", message);
        }

        let body = Json(serde_json::json!({
            "error": message,
            "detail": message,
            "code": status.as_u16(),
        }));

        (status, body).into_response()
    }
}
