use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

use crate::db::executor::{execute_query, Row};
use crate::error::AppError;
use crate::web::state::AppState;

#[derive(Debug, Deserialize, Clone)]
pub struct QueryRequest {
    #[serde(default)]
    pub question: String,
}

#[derive(Debug, Serialize)]
pub struct QueryResponse {
    pub sql: String,
    pub results: Vec<Row>,
    pub explanation: String,
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SchemaStatus {
    pub status: &'static str,
    pub schema_loaded: bool,
    pub schema_length: usize,
    pub table_count: usize,
    pub loaded_at: Option<String>,
    pub message: &'static str,
}

// Question -> prompt -> LLM -> sanitized SQL -> rows
pub async fn generate_sql(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<QueryRequest>,
) -> Result<Json<QueryResponse>, AppError> {
    let question = payload.question.trim();
    if question.is_empty() {
        return Err(AppError::Validation("Question cannot be empty".to_string()));
    }

    let start_time = Instant::now();
    info!("Received question: {}", question);

    let schema = state.schema_manager.description().await;
    let sql = state.llm_manager.generate_sql(question, &schema).await?;
    info!("Generated SQL: {}", sql);

    let results = execute_query(&state.db_pool, sql.clone()).await?;
    info!(
        "Successfully processed query, returned {} rows in {}ms",
        results.len(),
        start_time.elapsed().as_millis()
    );

    Ok(Json(QueryResponse {
        sql,
        results,
        explanation: "Query executed successfully".to_string(),
        error: None,
    }))
}

// Schema
pub async fn get_schema(State(state): State<Arc<AppState>>) -> Json<SchemaStatus> {
    Json(schema_status(&state).await)
}

pub async fn reload_schema(
    State(state): State<Arc<AppState>>,
) -> Result<Json<SchemaStatus>, AppError> {
    state
        .schema_manager
        .reload(&state.db_pool)
        .await
        .map_err(AppError::SchemaLoad)?;

    Ok(Json(schema_status(&state).await))
}

async fn schema_status(state: &AppState) -> SchemaStatus {
    let snapshot = state.schema_manager.snapshot().await;
    let loaded = !snapshot.description.is_empty();

    SchemaStatus {
        status: "ok",
        schema_loaded: loaded,
        schema_length: snapshot.description.len(),
        table_count: snapshot.table_count,
        loaded_at: snapshot.loaded_at.map(|t| t.to_rfc3339()),
        message: if loaded {
            "Database schema loaded and ready"
        } else {
            "Database schema not loaded"
        },
    }
}
