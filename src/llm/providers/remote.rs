use crate::config::LlmConfig;
use crate::llm::models::{ChatCompletionRequest, ChatCompletionResponse, ChatMessage, Prompt};
use crate::llm::{CompletionProvider, LlmError};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, error};

/// Client for an OpenAI-compatible `chat/completions` endpoint (Groq by default)
pub struct RemoteLlmProvider {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl RemoteLlmProvider {
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        let api_key = config
            .api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                LlmError::ConfigError("API key is required for remote LLM provider".to_string())
            })?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| LlmError::ConnectionError(e.to_string()))?;

        Ok(Self {
            client,
            api_url: config.api_url.clone(),
            api_key,
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }
}

#[async_trait]
impl CompletionProvider for RemoteLlmProvider {
    async fn complete(&self, prompt: &Prompt) -> Result<String, LlmError> {
        let request = ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: prompt.system.clone(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: prompt.user.clone(),
                },
            ],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        debug!("Calling LLM API: {} with model {}", self.api_url, self.model);

        let response = self
            .client
            .post(&self.api_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await
            .map_err(|e| LlmError::ConnectionError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = match response.text().await {
                Ok(body) => format!(" - Response body: {}", body),
                Err(_) => String::new(),
            };

            error!("LLM API responded with status code: {}{}", status, error_body);
            return Err(LlmError::ResponseError(format!(
                "API responded with status code: {}{}",
                status, error_body
            )));
        }

        let completion: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| LlmError::ParseError(e.to_string()))?;

        let content = completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(LlmError::EmptyResponse)?;

        debug!("Raw completion: {}", content);
        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::HeaderMap, http::StatusCode, routing::post, Json, Router};
    use serde_json::{json, Value};
    use std::sync::{Arc, Mutex};

    /// Serves `reply` for every completion request and records the bodies
    async fn mock_api(
        status: StatusCode,
        reply: Value,
    ) -> (String, Arc<Mutex<Vec<(Option<String>, Value)>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let recorded = Arc::clone(&seen);

        let app = Router::new().route(
            "/v1/chat/completions",
            post(move |headers: HeaderMap, Json(body): Json<Value>| {
                let recorded = Arc::clone(&recorded);
                let reply = reply.clone();
                async move {
                    let auth = headers
                        .get("authorization")
                        .and_then(|v| v.to_str().ok())
                        .map(str::to_string);
                    recorded.lock().unwrap().push((auth, body));
                    (status, Json(reply))
                }
            }),
        );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        (format!("http://{}/v1/chat/completions", addr), seen)
    }

    fn provider_for(api_url: String) -> RemoteLlmProvider {
        let config = LlmConfig {
            provider: "Groq".to_string(),
            model: "test-model".to_string(),
            api_key: Some("test-key".to_string()),
            api_url,
            temperature: 0.1,
            max_tokens: 500,
            timeout_secs: 5,
        };
        RemoteLlmProvider::new(&config).unwrap()
    }

    fn prompt() -> Prompt {
        Prompt {
            system: "system text".to_string(),
            user: "user text".to_string(),
        }
    }

    #[tokio::test]
    async fn returns_first_choice_content() {
        let (url, seen) = mock_api(
            StatusCode::OK,
            json!({"choices": [
                {"message": {"role": "assistant", "content": "  SELECT 1;  "}},
                {"message": {"role": "assistant", "content": "SELECT 2;"}}
            ]}),
        )
        .await;

        let content = provider_for(url).complete(&prompt()).await.unwrap();
        assert_eq!(content, "  SELECT 1;  ");

        let requests = seen.lock().unwrap();
        let (auth, body) = &requests[0];
        assert_eq!(auth.as_deref(), Some("Bearer test-key"));
        assert_eq!(body["model"], "test-model");
        assert_eq!(body["max_tokens"], 500);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][0]["content"], "system text");
        assert_eq!(body["messages"][1]["role"], "user");
        assert_eq!(body["messages"][1]["content"], "user text");
    }

    #[tokio::test]
    async fn error_status_is_reported_with_body() {
        let (url, _) = mock_api(
            StatusCode::UNAUTHORIZED,
            json!({"error": {"message": "Invalid API Key"}}),
        )
        .await;

        let err = provider_for(url).complete(&prompt()).await.unwrap_err();
        assert!(matches!(err, LlmError::ResponseError(_)));
        assert!(err.to_string().contains("401"));
        assert!(err.to_string().contains("Invalid API Key"));
    }

    #[tokio::test]
    async fn missing_or_blank_content_is_an_empty_response() {
        let (url, _) = mock_api(StatusCode::OK, json!({"choices": []})).await;
        let err = provider_for(url).complete(&prompt()).await.unwrap_err();
        assert!(matches!(err, LlmError::EmptyResponse));

        let (url, _) = mock_api(
            StatusCode::OK,
            json!({"choices": [{"message": {"content": "   "}}]}),
        )
        .await;
        let err = provider_for(url).complete(&prompt()).await.unwrap_err();
        assert!(matches!(err, LlmError::EmptyResponse));
    }

    #[tokio::test]
    async fn unreachable_api_is_a_connection_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = provider_for(format!("http://{}/v1/chat/completions", addr))
            .complete(&prompt())
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::ConnectionError(_)));
    }

    #[test]
    fn missing_api_key_is_a_config_error() {
        let config = LlmConfig {
            api_key: None,
            ..crate::config::AppConfig::default().llm
        };
        assert!(matches!(
            RemoteLlmProvider::new(&config),
            Err(LlmError::ConfigError(_))
        ));
    }
}
