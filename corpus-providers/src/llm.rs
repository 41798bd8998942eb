use async_trait::async_trait;
use corpus_core::error::{CoreError, LlmErrorKind, Result};
use corpus_core::traits::{LLMService, LlmRequest, OutputFormat};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use crate::config::ProviderConfig;

/// HTTP-backed LLM service speaking a minimal chat-completion protocol:
/// `{model, messages, temperature, response_format}` -> `{choices:
/// [{message: {content}}]}`.
pub struct HttpLLMService {
    client: reqwest::Client,
    config: ProviderConfig,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    response_format: serde_json::Value,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: String,
}

impl HttpLLMService {
    pub fn new(config: ProviderConfig) -> Self {
        HttpLLMService {
            client: reqwest::Client::new(),
            config,
        }
    }
}

#[async_trait]
impl LLMService for HttpLLMService {
    async fn generate(&self, request: LlmRequest) -> Result<String> {
        let model = request.model.as_deref().unwrap_or(&self.config.model);
        let mut messages = Vec::new();
        if let Some(system) = &request.system {
            messages.push(ChatMessage {
                role: "system",
                content: system,
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: &request.prompt,
        });

        let response_format = match request.format {
            OutputFormat::Json => json!({"type": "json_object"}),
            OutputFormat::Text => json!({"type": "text"}),
        };

        debug!(model, temperature = request.temperature, "calling llm provider");

        let mut http_request = self
            .client
            .post(&self.config.endpoint)
            .json(&ChatRequest {
                model,
                messages,
                temperature: request.temperature,
                response_format,
            })
            .timeout(self.config.timeout);
        if let Some(key) = &self.config.api_key {
            http_request = http_request.bearer_auth(key);
        }

        let response = http_request.send().await.map_err(|e| {
            if e.is_timeout() {
                CoreError::llm(LlmErrorKind::Timeout, e.to_string())
            } else {
                CoreError::llm(LlmErrorKind::Other, e.to_string())
            }
        })?;

        if !response.status().is_success() {
            return Err(CoreError::llm(
                LlmErrorKind::Other,
                format!("llm provider returned status {}", response.status()),
            ));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| CoreError::llm(LlmErrorKind::Schema, e.to_string()))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .unwrap_or_default();
        if content.trim().is_empty() {
            return Err(CoreError::llm(LlmErrorKind::Empty, "empty completion"));
        }
        Ok(content)
    }
}

/// Calls `service.generate` with exponential backoff (1s, 2s, 4s for the
/// default 3 retries), retrying only on retriable errors.
pub async fn call_llm_with_retry(
    service: &dyn LLMService,
    request: LlmRequest,
    max_retries: u32,
) -> Result<String> {
    let mut attempt = 0;
    loop {
        match service.generate(request.clone()).await {
            Ok(text) => return Ok(text),
            Err(err) if attempt < max_retries && err.is_retriable() => {
                let backoff = std::time::Duration::from_secs(1 << attempt);
                debug!(attempt, ?backoff, "retrying llm call after error");
                tokio::time::sleep(backoff).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

/// Deterministic, offline LLM service used in tests: returns a
/// caller-supplied canned response regardless of prompt content, or an
/// error if configured to simulate a failure.
pub struct MockLLMService {
    pub response: String,
}

impl MockLLMService {
    pub fn fixed(response: impl Into<String>) -> Self {
        MockLLMService {
            response: response.into(),
        }
    }
}

#[async_trait]
impl LLMService for MockLLMService {
    async fn generate(&self, _request: LlmRequest) -> Result<String> {
        Ok(self.response.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_llm_returns_fixed_response() {
        let service = MockLLMService::fixed("{\"claims\":[]}");
        let result = service.generate(LlmRequest::json("anything")).await.unwrap();
        assert_eq!(result, "{\"claims\":[]}");
    }

    #[tokio::test]
    async fn retry_gives_up_on_non_retriable_error() {
        struct AlwaysSchemaError;
        #[async_trait]
        impl LLMService for AlwaysSchemaError {
            async fn generate(&self, _request: LlmRequest) -> Result<String> {
                Err(CoreError::llm(LlmErrorKind::Schema, "bad json"))
            }
        }
        let result = call_llm_with_retry(&AlwaysSchemaError, LlmRequest::json("x"), 3).await;
        assert!(result.is_err());
    }
}
