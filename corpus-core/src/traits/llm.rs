use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;

/// Output mode requested of the LLM service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Text,
}

/// A single `generate` call, matching the external LLM service contract.
#[derive(Debug, Clone)]
pub struct LlmRequest {
    pub prompt: String,
    pub system: Option<String>,
    pub model: Option<String>,
    pub format: OutputFormat,
    pub temperature: f32,
    pub options: Value,
}

impl LlmRequest {
    pub fn json(prompt: impl Into<String>) -> Self {
        LlmRequest {
            prompt: prompt.into(),
            system: None,
            model: None,
            format: OutputFormat::Json,
            temperature: 0.0,
            options: Value::Null,
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }
}

/// Narrow contract the pipeline depends on for LLM calls. No streaming is
/// required by the core; every call is a single request/response round
/// trip that returns raw text (JSON-mode callers parse and validate it
/// themselves).
#[async_trait]
pub trait LLMService: Send + Sync {
    async fn generate(&self, request: LlmRequest) -> Result<String>;
}

/// Strips a leading/trailing markdown code fence (```` ```json ... ``` ````
/// or plain ```` ``` ... ``` ````) from LLM output before parsing, since
/// structured-output prompts are frequently answered with a fenced block
/// even under JSON mode.
pub fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(after_open) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let after_open = after_open
        .strip_prefix("json")
        .unwrap_or(after_open)
        .trim_start_matches(['\n', '\r']);
    after_open.strip_suffix("```").unwrap_or(after_open).trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_json_fence() {
        let raw = "```json\n{\"a\":1}\n```";
        assert_eq!(strip_code_fence(raw), "{\"a\":1}");
    }

    #[test]
    fn strips_plain_fence() {
        let raw = "```\n{\"a\":1}\n```";
        assert_eq!(strip_code_fence(raw), "{\"a\":1}");
    }

    #[test]
    fn passes_through_unfenced() {
        let raw = "{\"a\":1}";
        assert_eq!(strip_code_fence(raw), "{\"a\":1}");
    }
}
