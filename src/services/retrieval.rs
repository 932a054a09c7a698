//! Query-time retrieval of relevant chunks.

use std::sync::Arc;
use std::time::Duration;

use crate::error::{EmbeddingError, RetrievalError, VectorStoreError};
use crate::models::{RetrievalConfig, RetrievedChunk};
use crate::services::embedding::Embedder;
use crate::services::vector_store::VectorStore;
use crate::utils::retry::{RetryConfig, with_retry};

/// Embeds a query and runs an owner-scoped similarity search.
///
/// Isolation is structural: the vector store API takes the owner id and
/// builds the filter itself, so there is no path that searches the whole
/// collection.
pub struct RetrievalService {
    embedder: Arc<dyn Embedder>,
    vectors: Arc<dyn VectorStore>,
    config: RetrievalConfig,
    retry: RetryConfig,
}

impl RetrievalService {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        vectors: Arc<dyn VectorStore>,
        config: RetrievalConfig,
    ) -> Self {
        Self {
            embedder,
            vectors,
            config,
            retry: RetryConfig::default(),
        }
    }

    #[must_use]
    pub fn with_retry_config(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Top-`limit` chunks relevant to `query`, restricted to `owner_id`.
    ///
    /// An owner with no indexed content gets an empty list, not an
    /// error. Call-site timeouts classify as transient failures.
    pub async fn retrieve(
        &self,
        query: &str,
        owner_id: &str,
        limit: Option<u32>,
    ) -> Result<Vec<RetrievedChunk>, RetrievalError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(RetrievalError::InvalidQuery(
                "query cannot be empty".to_string(),
            ));
        }

        let limit = limit.unwrap_or(self.config.default_limit);
        let timeout = Duration::from_secs(self.config.timeout_secs);

        let query_vector = with_retry(&self.retry, "embed_query", || async {
            match tokio::time::timeout(timeout, self.embedder.embed_query(query)).await {
                Ok(result) => result,
                Err(_) => Err(EmbeddingError::Timeout),
            }
        })
        .await?;

        let hits = with_retry(&self.retry, "vector_search", || {
            let vector = query_vector.clone();
            async move {
                match tokio::time::timeout(
                    timeout,
                    self.vectors
                        .search(vector, owner_id, u64::from(limit), self.config.min_score),
                )
                .await
                {
                    Ok(result) => result,
                    Err(_) => Err(VectorStoreError::Timeout),
                }
            }
        })
        .await?;

        tracing::debug!(
            owner_id,
            results = hits.len(),
            top_score = hits.first().map(|h| h.score),
            "retrieval complete"
        );

        Ok(hits
            .into_iter()
            .map(|hit| RetrievedChunk {
                text: hit.payload.content,
                document_id: hit.payload.document_id,
                score: hit.score,
            })
            .collect())
    }
}
