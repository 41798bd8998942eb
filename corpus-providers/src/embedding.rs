use async_trait::async_trait;
use corpus_core::error::{CoreError, Result};
use corpus_core::traits::EmbeddingService;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::ProviderConfig;

/// HTTP-backed embedding service speaking a minimal `{input}` -> `{data:
/// [{embedding}]}` protocol, compatible with common OpenAI-style embedding
/// endpoints.
pub struct HttpEmbeddingService {
    client: reqwest::Client,
    config: ProviderConfig,
    dimensions: usize,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    input: &'a [String],
    model: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingDatum>,
}

#[derive(Deserialize)]
struct EmbeddingDatum {
    embedding: Vec<f32>,
}

impl HttpEmbeddingService {
    pub fn new(config: ProviderConfig, dimensions: usize) -> Self {
        HttpEmbeddingService {
            client: reqwest::Client::new(),
            config,
            dimensions,
        }
    }
}

#[async_trait]
impl EmbeddingService for HttpEmbeddingService {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        debug!(count = texts.len(), "requesting embeddings");

        let mut request = self
            .client
            .post(&self.config.endpoint)
            .json(&EmbeddingRequest {
                input: texts,
                model: &self.config.model,
            })
            .timeout(self.config.timeout);
        if let Some(key) = &self.config.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(crate::error::ProviderError::Http)?;
        if !response.status().is_success() {
            return Err(CoreError::Embedding(format!(
                "embedding provider returned status {}",
                response.status()
            )));
        }

        let parsed: EmbeddingResponse = response
            .json()
            .await
            .map_err(crate::error::ProviderError::Http)?;
        if parsed.data.is_empty() {
            warn!("embedding provider returned no vectors");
            return Err(CoreError::Embedding("empty embedding response".into()));
        }

        Ok(parsed.data.into_iter().map(|d| d.embedding).collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

/// Deterministic, offline embedding service used in tests and dry-run CLI
/// invocations: hashes each text into a fixed-size vector so that equal
/// inputs always produce equal (and thus maximally similar) vectors.
pub struct MockEmbeddingService {
    dimensions: usize,
}

impl MockEmbeddingService {
    pub fn new(dimensions: usize) -> Self {
        MockEmbeddingService { dimensions }
    }
}

impl Default for MockEmbeddingService {
    fn default() -> Self {
        MockEmbeddingService::new(16)
    }
}

fn hash_embed(text: &str, dimensions: usize) -> Vec<f32> {
    let mut vector = vec![0.0f32; dimensions];
    for (i, byte) in text.bytes().enumerate() {
        vector[i % dimensions] += byte as f32;
    }
    let norm: f32 = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for v in &mut vector {
            *v /= norm;
        }
    }
    vector
}

#[async_trait]
impl EmbeddingService for MockEmbeddingService {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts
            .iter()
            .map(|t| hash_embed(t, self.dimensions))
            .collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_embed_is_deterministic() {
        let service = MockEmbeddingService::default();
        let a = service.embed(&["hello world".into()]).await.unwrap();
        let b = service.embed(&["hello world".into()]).await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn mock_embed_preserves_order() {
        let service = MockEmbeddingService::default();
        let texts = vec!["one".to_string(), "two".to_string()];
        let result = service.embed(&texts).await.unwrap();
        assert_eq!(result.len(), 2);
        assert_ne!(result[0], result[1]);
    }
}
