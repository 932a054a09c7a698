//! Embedding client for an OpenAI-compatible embeddings API.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::EmbeddingError;
use crate::models::EmbeddingConfig;

/// Converts text into fixed-dimension vectors.
///
/// Implementations must preserve order: vector `i` corresponds to input
/// text `i`. A batch either fully succeeds or fully fails; partial
/// results are never returned.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a batch of texts, one vector per input, in input order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError>;

    /// Embed a single query string.
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;

    /// Dimensionality every returned vector is guaranteed to have.
    fn dimension(&self) -> usize;
}

/// Request body for the /embeddings endpoint.
#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    data: Vec<EmbeddingItem>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingItem {
    index: usize,
    embedding: Vec<f32>,
}

/// HTTP client for a hosted embedding model.
#[derive(Debug, Clone)]
pub struct HttpEmbedder {
    client: Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
    dimension: usize,
    batch_size: usize,
}

impl HttpEmbedder {
    /// Create a new embedding client with the given configuration.
    pub fn new(config: &EmbeddingConfig) -> Result<Self, EmbeddingError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| EmbeddingError::ConnectionError(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key: config.api_key.clone(),
            dimension: config.dimension as usize,
            batch_size: config.batch_size as usize,
        })
    }

    async fn embed_single_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let url = format!("{}/embeddings", self.base_url);
        let request = EmbedRequest {
            model: &self.model,
            input: texts,
        };

        let mut builder = self.client.post(&url).json(&request);
        if let Some(ref key) = self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                EmbeddingError::Timeout
            } else {
                EmbeddingError::RequestError(e)
            }
        })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::ApiError { status, body });
        }

        let embed_response: EmbedResponse = response
            .json()
            .await
            .map_err(|e| EmbeddingError::InvalidResponse(e.to_string()))?;

        vectors_in_order(embed_response, texts.len(), self.dimension)
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        // Split over the provider's per-request input cap. Any sub-batch
        // failure fails the whole call; nothing partial escapes.
        let mut all_embeddings = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            let embeddings = self.embed_single_batch(batch).await?;
            all_embeddings.extend(embeddings);
        }

        Ok(all_embeddings)
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let input = vec![text.to_string()];
        let embeddings = self.embed_batch(&input).await?;
        embeddings
            .into_iter()
            .next()
            .ok_or_else(|| EmbeddingError::InvalidResponse("empty embedding response".to_string()))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

/// Re-order response vectors by their `index` field and verify shape.
///
/// Providers may return items out of order; positional correspondence is
/// restored here. A count or dimension mismatch is a configuration
/// defect, not a retryable failure.
fn vectors_in_order(
    response: EmbedResponse,
    sent: usize,
    dimension: usize,
) -> Result<Vec<Vec<f32>>, EmbeddingError> {
    if response.data.len() != sent {
        return Err(EmbeddingError::CountMismatch {
            sent,
            received: response.data.len(),
        });
    }

    let mut ordered: Vec<Option<Vec<f32>>> = vec![None; sent];
    for item in response.data {
        if item.embedding.len() != dimension {
            return Err(EmbeddingError::DimensionMismatch {
                expected: dimension,
                actual: item.embedding.len(),
            });
        }
        let slot = ordered.get_mut(item.index).ok_or_else(|| {
            EmbeddingError::InvalidResponse(format!("embedding index {} out of range", item.index))
        })?;
        if slot.replace(item.embedding).is_some() {
            return Err(EmbeddingError::InvalidResponse(format!(
                "duplicate embedding index {}",
                item.index
            )));
        }
    }

    // Every slot filled: len matched and indexes were unique and in range
    Ok(ordered.into_iter().map(|v| v.unwrap_or_default()).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(index: usize, fill: f32, dim: usize) -> EmbeddingItem {
        EmbeddingItem {
            index,
            embedding: vec![fill; dim],
        }
    }

    #[test]
    fn test_client_creation() {
        let config = EmbeddingConfig::default();
        assert!(HttpEmbedder::new(&config).is_ok());
    }

    #[test]
    fn test_base_url_trimming() {
        let config = EmbeddingConfig {
            url: "http://localhost:8000/v1/".to_string(),
            ..Default::default()
        };
        let client = HttpEmbedder::new(&config).unwrap();
        assert_eq!(client.base_url, "http://localhost:8000/v1");
    }

    #[test]
    fn test_vectors_reordered_by_index() {
        let response = EmbedResponse {
            data: vec![item(2, 2.0, 3), item(0, 0.0, 3), item(1, 1.0, 3)],
        };
        let vectors = vectors_in_order(response, 3, 3).unwrap();
        assert_eq!(vectors[0], vec![0.0; 3]);
        assert_eq!(vectors[1], vec![1.0; 3]);
        assert_eq!(vectors[2], vec![2.0; 3]);
    }

    #[test]
    fn test_count_mismatch_rejected() {
        let response = EmbedResponse {
            data: vec![item(0, 0.0, 3)],
        };
        let err = vectors_in_order(response, 2, 3).unwrap_err();
        assert!(matches!(
            err,
            EmbeddingError::CountMismatch {
                sent: 2,
                received: 1
            }
        ));
    }

    #[test]
    fn test_dimension_mismatch_rejected() {
        let response = EmbedResponse {
            data: vec![item(0, 0.0, 4)],
        };
        let err = vectors_in_order(response, 1, 3).unwrap_err();
        assert!(matches!(
            err,
            EmbeddingError::DimensionMismatch {
                expected: 3,
                actual: 4
            }
        ));
    }

    #[test]
    fn test_duplicate_index_rejected() {
        let response = EmbedResponse {
            data: vec![item(0, 0.0, 3), item(0, 1.0, 3)],
        };
        assert!(vectors_in_order(response, 2, 3).is_err());
    }

    #[test]
    fn test_out_of_range_index_rejected() {
        let response = EmbedResponse {
            data: vec![item(5, 0.0, 3)],
        };
        assert!(vectors_in_order(response, 1, 3).is_err());
    }
}
