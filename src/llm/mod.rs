pub mod models;
pub mod prompt;
pub mod providers;
pub mod sanitize;

use crate::config::LlmConfig;
use crate::llm::models::Prompt;
use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("LLM connection error: {0}")]
    ConnectionError(String),

    #[error("LLM response error: {0}")]
    ResponseError(String),

    #[error("LLM response parsing error: {0}")]
    ParseError(String),

    #[error("LLM returned an empty completion")]
    EmptyResponse,

    #[error("Failed to generate SQL")]
    EmptyGeneration,

    #[error("LLM configuration error: {0}")]
    ConfigError(String),
}

/// A chat-completion backend returning the raw text of the first completion
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn complete(&self, prompt: &Prompt) -> Result<String, LlmError>;
}

/// Turns a question plus schema context into executable SQL
pub struct LlmManager {
    provider: Box<dyn CompletionProvider>,
    model: String,
}

impl LlmManager {
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        let provider = providers::remote::RemoteLlmProvider::new(config)?;
        Ok(Self::with_provider(Box::new(provider), config.model.clone()))
    }

    pub fn with_provider(provider: Box<dyn CompletionProvider>, model: String) -> Self {
        Self { provider, model }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub async fn generate_sql(&self, question: &str, schema: &str) -> Result<String, LlmError> {
        let prompt = prompt::build_prompt(schema, question);

        info!("Generating SQL with model {}", self.model);
        let raw = self.provider.complete(&prompt).await?;

        sanitize::sanitize_sql(&raw)
    }
}
