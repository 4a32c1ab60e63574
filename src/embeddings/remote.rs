//! Remote embedding service over HTTP
//!
//! Calls an OpenAI-compatible embeddings endpoint with bounded retries and
//! exponential backoff. Responses are validated for dimensionality and
//! finiteness before they reach the similarity path.

use crate::embeddings::EmbeddingService;
use crate::error::{RepertoireError, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Embedding dimension for text-embedding-3-small
pub const DEFAULT_EMBEDDING_DIM: usize = 1536;

/// Maximum retry attempts for rate limiting and timeouts
const MAX_RETRIES: usize = 3;

/// Backoff base duration in milliseconds
const BACKOFF_BASE_MS: u64 = 1000;

/// Request timeout duration
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// HTTP embedding client
pub struct RemoteEmbeddingService {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
    dimensions: usize,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest {
    input: String,
    model: String,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

impl RemoteEmbeddingService {
    /// Create a new remote embedding service
    ///
    /// # Arguments
    /// * `api_key` - API key for the embeddings endpoint
    /// * `model` - Model name (defaults to "text-embedding-3-small")
    /// * `base_url` - API base URL (defaults to the OpenAI endpoint)
    pub fn new(api_key: String, model: Option<String>, base_url: Option<String>) -> Result<Self> {
        if api_key.is_empty() {
            return Err(RepertoireError::Validation(
                "API key cannot be empty".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        let model = model.unwrap_or_else(|| "text-embedding-3-small".to_string());
        let base_url = base_url.unwrap_or_else(|| "https://api.openai.com/v1".to_string());

        Ok(Self {
            client,
            api_key,
            model,
            base_url,
            dimensions: DEFAULT_EMBEDDING_DIM,
        })
    }

    /// Call the embeddings API with retry on rate limiting and timeouts
    async fn call_api_with_retry(&self, text: &str) -> Result<Vec<f32>> {
        let mut retries = 0;

        loop {
            match self.call_api(text).await {
                Ok(embedding) => return Ok(embedding),
                Err(e) => {
                    if retries >= MAX_RETRIES {
                        return Err(e);
                    }

                    let should_retry = match &e {
                        RepertoireError::RateLimited(_) => true,
                        RepertoireError::Http(err) => err.is_timeout(),
                        _ => false,
                    };

                    if !should_retry {
                        return Err(e);
                    }

                    let backoff_ms = BACKOFF_BASE_MS * 2_u64.pow(retries as u32);
                    warn!(
                        "Embedding call failed, retrying after {}ms (attempt {}/{})",
                        backoff_ms,
                        retries + 1,
                        MAX_RETRIES
                    );

                    sleep(Duration::from_millis(backoff_ms)).await;
                    retries += 1;
                }
            }
        }
    }

    async fn call_api(&self, text: &str) -> Result<Vec<f32>> {
        debug!("Embedding {} chars with model {}", text.len(), self.model);

        let request = EmbeddingRequest {
            input: text.to_string(),
            model: self.model.clone(),
        };

        let response = self
            .client
            .post(format!("{}/embeddings", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await?;

        let status = response.status();

        match status {
            StatusCode::OK => {
                let body: EmbeddingResponse = response
                    .json()
                    .await
                    .map_err(|e| RepertoireError::Embedding(e.to_string()))?;

                body.data
                    .into_iter()
                    .next()
                    .map(|d| d.embedding)
                    .ok_or_else(|| {
                        RepertoireError::Embedding("Empty response from API".to_string())
                    })
            }
            StatusCode::TOO_MANY_REQUESTS => Err(RepertoireError::RateLimited(
                "Embedding API rate limit exceeded".to_string(),
            )),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(RepertoireError::Embedding(
                "Invalid or missing API key".to_string(),
            )),
            _ => {
                let error_text = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "Unknown error".to_string());
                Err(RepertoireError::Embedding(format!(
                    "API error (status {}): {}",
                    status, error_text
                )))
            }
        }
    }

    /// Validate dimensionality and finiteness of a returned vector
    fn validate_embedding(&self, embedding: &[f32]) -> Result<()> {
        if embedding.len() != self.dimensions {
            return Err(RepertoireError::Embedding(format!(
                "Expected {} dimensions, got {}",
                self.dimensions,
                embedding.len()
            )));
        }

        if embedding.iter().any(|&x| !x.is_finite()) {
            return Err(RepertoireError::Embedding(
                "Embedding contains invalid values (NaN or Inf)".to_string(),
            ));
        }

        Ok(())
    }
}

#[async_trait]
impl EmbeddingService for RemoteEmbeddingService {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if text.is_empty() {
            return Err(RepertoireError::Validation(
                "Embedding input cannot be empty".to_string(),
            ));
        }

        let embedding = self.call_api_with_retry(text).await?;
        self.validate_embedding(&embedding)?;

        Ok(embedding)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_creation() {
        let service =
            RemoteEmbeddingService::new("test-key".to_string(), None, None).unwrap();
        assert_eq!(service.dimensions(), DEFAULT_EMBEDDING_DIM);
        assert_eq!(service.model_name(), "text-embedding-3-small");
    }

    #[test]
    fn test_empty_api_key_error() {
        let result = RemoteEmbeddingService::new("".to_string(), None, None);
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_embedding() {
        let service =
            RemoteEmbeddingService::new("test-key".to_string(), None, None).unwrap();

        let valid = vec![0.5; DEFAULT_EMBEDDING_DIM];
        assert!(service.validate_embedding(&valid).is_ok());

        let wrong_dims = vec![0.5; 512];
        assert!(service.validate_embedding(&wrong_dims).is_err());

        let mut nan_embedding = vec![0.5; DEFAULT_EMBEDDING_DIM];
        nan_embedding[0] = f32::NAN;
        assert!(service.validate_embedding(&nan_embedding).is_err());
    }
}
