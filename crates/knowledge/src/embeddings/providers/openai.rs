//! OpenAI-compatible embedding provider.
//!
//! Talks to `POST {endpoint}/embeddings` with the whole batch as input.

use crate::embeddings::config::EmbeddingConfig;
use crate::embeddings::provider::EmbeddingProvider;
use cardio_core::{AppError, AppResult};
use cardio_llm::providers::openai::DEFAULT_OPENAI_URL;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Request timeout in seconds
const REQUEST_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

/// OpenAI embeddings client.
#[derive(Debug)]
pub struct OpenAiEmbeddingProvider {
    base_url: String,
    api_key: String,
    model: String,
    dimensions: usize,
    client: reqwest::Client,
}

impl OpenAiEmbeddingProvider {
    pub fn new(config: &EmbeddingConfig, api_key: impl Into<String>) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| AppError::BackendError(format!("Failed to create HTTP client: {}", e)))?;

        let base_url = config.endpoint.as_deref().unwrap_or(DEFAULT_OPENAI_URL);

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: config.model.clone(),
            dimensions: config.dimensions,
            client,
        })
    }

    /// Put vectors back in input order and check their shape.
    fn collect_vectors(&self, response: EmbeddingResponse, expected: usize) -> AppResult<Vec<Vec<f32>>> {
        let mut data = response.data;
        if data.len() != expected {
            return Err(AppError::BackendError(format!(
                "Embedding API returned {} vectors for {} inputs",
                data.len(),
                expected
            )));
        }

        data.sort_by_key(|d| d.index);

        data.into_iter()
            .map(|d| {
                if d.embedding.len() != self.dimensions {
                    return Err(AppError::BackendError(format!(
                        "Embedding has {} dimensions, expected {}",
                        d.embedding.len(),
                        self.dimensions
                    )));
                }
                Ok(d.embedding)
            })
            .collect()
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for OpenAiEmbeddingProvider {
    fn provider_name(&self) -> &str {
        "openai"
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        tracing::debug!(model = %self.model, count = texts.len(), "Requesting embeddings");

        let url = format!("{}/embeddings", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&EmbeddingRequest {
                model: &self.model,
                input: texts,
            })
            .send()
            .await
            .map_err(|e| AppError::BackendError(format!("Failed to send embedding request: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::BackendError(format!(
                "Embedding API error ({}): {}",
                status, error_text
            )));
        }

        let parsed: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| AppError::BackendError(format!("Failed to parse embedding response: {}", e)))?;

        self.collect_vectors(parsed, texts.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider(dimensions: usize) -> OpenAiEmbeddingProvider {
        let config = EmbeddingConfig {
            dimensions,
            endpoint: Some("http://localhost:8080/v1/".to_string()),
            ..EmbeddingConfig::default()
        };
        OpenAiEmbeddingProvider::new(&config, "sk-test").unwrap()
    }

    #[test]
    fn test_endpoint_trailing_slash_is_trimmed() {
        assert_eq!(provider(3).base_url, "http://localhost:8080/v1");
    }

    #[test]
    fn test_request_shape() {
        let input = vec!["a".to_string(), "b".to_string()];
        let body = serde_json::to_value(EmbeddingRequest {
            model: "text-embedding-ada-002",
            input: &input,
        })
        .unwrap();
        assert_eq!(body["model"], "text-embedding-ada-002");
        assert_eq!(body["input"][1], "b");
    }

    #[test]
    fn test_vectors_are_reordered_by_index() {
        let raw = r#"{"data": [
            {"index": 1, "embedding": [0.0, 1.0]},
            {"index": 0, "embedding": [1.0, 0.0]}
        ]}"#;
        let parsed: EmbeddingResponse = serde_json::from_str(raw).unwrap();
        let vectors = provider(2).collect_vectors(parsed, 2).unwrap();
        assert_eq!(vectors, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
    }

    #[test]
    fn test_wrong_dimension_is_backend_error() {
        let raw = r#"{"data": [{"index": 0, "embedding": [1.0]}]}"#;
        let parsed: EmbeddingResponse = serde_json::from_str(raw).unwrap();
        assert!(matches!(
            provider(2).collect_vectors(parsed, 1),
            Err(AppError::BackendError(_))
        ));
    }

    #[test]
    fn test_count_mismatch_is_backend_error() {
        let parsed: EmbeddingResponse = serde_json::from_str(r#"{"data": []}"#).unwrap();
        assert!(provider(2).collect_vectors(parsed, 1).is_err());
    }
}
