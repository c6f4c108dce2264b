// Shared helpers for HTTP-level tests

use crate::config::AppConfig;
use crate::db::db_pool::{build_pool, DuckDBConnectionManager, IN_MEMORY};
use crate::llm::models::Prompt;
use crate::llm::{CompletionProvider, LlmError, LlmManager};
use crate::web::routes;
use crate::web::state::AppState;
use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tower::util::ServiceExt;

/// Completion provider with a canned reply
pub struct StubProvider {
    pub reply: Result<String, String>,
    pub calls: Arc<AtomicUsize>,
}

#[async_trait]
impl CompletionProvider for StubProvider {
    async fn complete(&self, _prompt: &Prompt) -> Result<String, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.reply.clone().map_err(LlmError::ConnectionError)
    }
}

pub fn test_config(connection_string: &str, pool_size: u32) -> AppConfig {
    let mut config = AppConfig::default();
    config.database.connection_string = connection_string.to_string();
    config.database.pool_size = pool_size;
    config.database.connection_timeout_secs = 2;
    config.llm.api_key = Some("test-key".to_string());
    config
}

pub fn create_test_state(
    config: AppConfig,
    reply: Result<&str, &str>,
) -> (Arc<AppState>, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let provider = StubProvider {
        reply: reply.map(str::to_string).map_err(str::to_string),
        calls: Arc::clone(&calls),
    };

    let manager = DuckDBConnectionManager::new(
        config.database.connection_string.clone(),
        config.database.read_only,
    );
    let pool = build_pool(manager.clone(), &config.database);
    let llm = LlmManager::with_provider(Box::new(provider), config.llm.model.clone());

    (Arc::new(AppState::new(config, pool, manager, llm)), calls)
}

/// In-memory database seeded with a small invoicing schema
pub async fn seeded_state(reply: Result<&str, &str>) -> (Arc<AppState>, Arc<AtomicUsize>) {
    let (state, calls) = create_test_state(test_config(IN_MEMORY, 2), reply);

    state
        .db_pool
        .get()
        .expect("Should get connection")
        .execute_batch(
            "CREATE TABLE vendors (id INTEGER NOT NULL, name VARCHAR NOT NULL);
             CREATE TABLE invoices (id INTEGER NOT NULL, vendor_id INTEGER, total DOUBLE, issued_on DATE);
             INSERT INTO vendors VALUES (1, 'Acme'), (2, 'Globex');
             INSERT INTO invoices VALUES (10, 1, 250.5, DATE '2024-03-01'), (11, 2, 99.75, DATE '2024-03-02');",
        )
        .expect("Should seed database");

    state.initialize().await;
    (state, calls)
}

pub async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.expect("Router should respond");
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Body should be readable");
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .body(Body::empty())
        .expect("Valid request")
}

pub fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("Valid request")
}

pub fn app(state: &Arc<AppState>) -> Router {
    routes::app(Arc::clone(state))
}
