//! Qdrant vector store backend.

use async_trait::async_trait;
use qdrant_client::Qdrant;
use qdrant_client::qdrant::{
    Condition, CreateCollectionBuilder, CreateFieldIndexCollectionBuilder, DeletePointsBuilder,
    Distance, FieldType, Filter, PointStruct, SearchPointsBuilder, UpsertPointsBuilder,
    VectorParamsBuilder,
};
use std::collections::HashMap;
use uuid::Uuid;

use super::{ChunkPayload, ChunkPoint, CollectionInfo, ScoredChunk, VectorStore};
use crate::error::VectorStoreError;
use crate::models::VectorStoreConfig;

/// Payload field holding the owning document's id.
pub const FIELD_DOCUMENT_ID: &str = "document_id";
/// Payload field holding the uploading user's id.
pub const FIELD_OWNER_ID: &str = "owner_id";
const FIELD_CHUNK_INDEX: &str = "chunk_index";
const FIELD_CONTENT: &str = "content";

/// Qdrant-backed implementation of [`VectorStore`].
pub struct QdrantBackend {
    client: Qdrant,
    collection: String,
    dimension: u64,
}

impl QdrantBackend {
    /// Create a backend for the configured collection and vector size.
    ///
    /// Endpoint normalization happens here, once: deployments hand us
    /// REST URLs, bare hosts, or trailing slashes depending on the
    /// environment, and the gRPC client needs a single canonical form.
    /// A URL that cannot be normalized is a configuration error, not a
    /// retryable one.
    pub fn new(config: &VectorStoreConfig, dimension: u64) -> Result<Self, VectorStoreError> {
        let url = normalize_url(&config.url)?;

        let mut builder = Qdrant::from_url(&url);
        if let Some(ref api_key) = config.api_key {
            builder = builder.api_key(api_key.clone());
        }

        let client = builder
            .build()
            .map_err(|e| VectorStoreError::ConfigError(e.to_string()))?;

        Ok(Self {
            client,
            collection: config.collection.clone(),
            dimension,
        })
    }

    fn owner_filter(owner_id: &str) -> Filter {
        Filter::must([Condition::matches(FIELD_OWNER_ID, owner_id.to_string())])
    }
}

/// Reconcile the configured endpoint into a canonical gRPC URL.
///
/// Strips trailing slashes, rewrites the REST port (6333) to the gRPC
/// port (6334), and appends the default gRPC port to bare hosts.
fn normalize_url(raw: &str) -> Result<String, VectorStoreError> {
    let url = raw.trim().trim_end_matches('/');

    let Some((scheme, rest)) = url.split_once("://") else {
        return Err(VectorStoreError::ConfigError(format!(
            "vector store URL must include a scheme: {raw:?}"
        )));
    };
    if rest.is_empty() {
        return Err(VectorStoreError::ConfigError(format!(
            "vector store URL has no host: {raw:?}"
        )));
    }

    match rest.rsplit_once(':') {
        Some((host, port)) if port.chars().all(|c| c.is_ascii_digit()) && !port.is_empty() => {
            if port == "6333" {
                Ok(format!("{scheme}://{host}:6334"))
            } else {
                Ok(url.to_string())
            }
        }
        _ => Ok(format!("{url}:6334")),
    }
}

fn string_value(value: Option<&qdrant_client::qdrant::Value>) -> String {
    value
        .and_then(|v| match &v.kind {
            Some(qdrant_client::qdrant::value::Kind::StringValue(s)) => Some(s.clone()),
            _ => None,
        })
        .unwrap_or_default()
}

fn integer_value(value: Option<&qdrant_client::qdrant::Value>) -> i64 {
    value
        .and_then(|v| match &v.kind {
            Some(qdrant_client::qdrant::value::Kind::IntegerValue(n)) => Some(*n),
            _ => None,
        })
        .unwrap_or_default()
}

#[async_trait]
impl VectorStore for QdrantBackend {
    async fn health_check(&self) -> Result<bool, VectorStoreError> {
        self.client
            .health_check()
            .await
            .map(|_| true)
            .map_err(|e| VectorStoreError::ConnectionError(e.to_string()))
    }

    async fn collection_info(&self) -> Result<Option<CollectionInfo>, VectorStoreError> {
        match self.client.collection_info(&self.collection).await {
            Ok(info) => Ok(Some(CollectionInfo {
                points_count: info.result.map_or(0, |r| r.points_count.unwrap_or(0)),
            })),
            Err(e) => {
                let msg = e.to_string();
                if msg.contains("not found") || msg.contains("doesn't exist") {
                    Ok(None)
                } else {
                    Err(VectorStoreError::CollectionError(msg))
                }
            }
        }
    }

    async fn ensure_collection(&self) -> Result<(), VectorStoreError> {
        if self.collection_info().await?.is_none() {
            let create_collection = CreateCollectionBuilder::new(&self.collection).vectors_config(
                VectorParamsBuilder::new(self.dimension, Distance::Cosine),
            );

            self.client
                .create_collection(create_collection)
                .await
                .map_err(|e| VectorStoreError::CollectionError(e.to_string()))?;
        }

        // Keyword indexes make the owner filter and the per-document
        // delete efficient. Qdrant treats re-creation as an error on some
        // versions, so "already exists" is folded into success.
        for field in [FIELD_DOCUMENT_ID, FIELD_OWNER_ID] {
            let index = CreateFieldIndexCollectionBuilder::new(
                &self.collection,
                field,
                FieldType::Keyword,
            )
            .wait(true);

            match self.client.create_field_index(index).await {
                Ok(_) => {}
                Err(e) if e.to_string().to_lowercase().contains("already exists") => {}
                Err(e) => return Err(VectorStoreError::CollectionError(e.to_string())),
            }
        }

        Ok(())
    }

    async fn upsert_points(&self, points: Vec<ChunkPoint>) -> Result<(), VectorStoreError> {
        if points.is_empty() {
            return Ok(());
        }

        let points: Vec<PointStruct> = points
            .into_iter()
            .map(|point| {
                let mut payload: HashMap<String, qdrant_client::qdrant::Value> = HashMap::new();
                payload.insert(
                    FIELD_DOCUMENT_ID.to_string(),
                    point.payload.document_id.to_string().into(),
                );
                payload.insert(FIELD_CHUNK_INDEX.to_string(), point.payload.chunk_index.into());
                payload.insert(FIELD_CONTENT.to_string(), point.payload.content.into());
                payload.insert(FIELD_OWNER_ID.to_string(), point.payload.owner_id.into());

                PointStruct::new(point.id.to_string(), point.vector, payload)
            })
            .collect();

        // wait=true: the call returns only after the write is durable, so
        // a crash leaves a well-defined prefix of batches committed
        let upsert = UpsertPointsBuilder::new(&self.collection, points).wait(true);

        self.client
            .upsert_points(upsert)
            .await
            .map_err(|e| VectorStoreError::UpsertError(e.to_string()))?;

        Ok(())
    }

    async fn search(
        &self,
        query_vector: Vec<f32>,
        owner_id: &str,
        limit: u64,
        min_score: Option<f32>,
    ) -> Result<Vec<ScoredChunk>, VectorStoreError> {
        let mut search_builder =
            SearchPointsBuilder::new(&self.collection, query_vector, limit)
                .with_payload(true)
                .filter(Self::owner_filter(owner_id));

        if let Some(score) = min_score {
            search_builder = search_builder.score_threshold(score);
        }

        let results = self
            .client
            .search_points(search_builder)
            .await
            .map_err(|e| VectorStoreError::SearchError(e.to_string()))?;

        let scored = results
            .result
            .into_iter()
            .map(|point| {
                let payload = point.payload;

                let document_id = Uuid::parse_str(&string_value(payload.get(FIELD_DOCUMENT_ID)))
                    .unwrap_or(Uuid::nil());

                let chunk_payload = ChunkPayload {
                    document_id,
                    chunk_index: integer_value(payload.get(FIELD_CHUNK_INDEX)),
                    content: string_value(payload.get(FIELD_CONTENT)),
                    owner_id: string_value(payload.get(FIELD_OWNER_ID)),
                };

                let id = match point.id.and_then(|id| id.point_id_options) {
                    Some(qdrant_client::qdrant::point_id::PointIdOptions::Uuid(uuid)) => uuid,
                    Some(qdrant_client::qdrant::point_id::PointIdOptions::Num(num)) => {
                        num.to_string()
                    }
                    None => String::new(),
                };

                ScoredChunk {
                    id,
                    score: point.score,
                    payload: chunk_payload,
                }
            })
            .collect();

        Ok(scored)
    }

    async fn delete_by_document(&self, document_id: Uuid) -> Result<(), VectorStoreError> {
        let filter = Filter::must([Condition::matches(
            FIELD_DOCUMENT_ID,
            document_id.to_string(),
        )]);

        let delete = DeletePointsBuilder::new(&self.collection)
            .points(filter)
            .wait(true);

        self.client
            .delete_points(delete)
            .await
            .map_err(|e| VectorStoreError::DeleteError(e.to_string()))?;

        Ok(())
    }

    fn collection(&self) -> &str {
        &self.collection
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_bare_host_gets_grpc_port() {
        assert_eq!(
            normalize_url("http://localhost").unwrap(),
            "http://localhost:6334"
        );
        assert_eq!(
            normalize_url("https://qdrant.internal/").unwrap(),
            "https://qdrant.internal:6334"
        );
    }

    #[test]
    fn test_normalize_rewrites_rest_port() {
        assert_eq!(
            normalize_url("http://localhost:6333").unwrap(),
            "http://localhost:6334"
        );
    }

    #[test]
    fn test_normalize_keeps_explicit_port() {
        assert_eq!(
            normalize_url("http://localhost:6334").unwrap(),
            "http://localhost:6334"
        );
        assert_eq!(
            normalize_url("http://qdrant:7000").unwrap(),
            "http://qdrant:7000"
        );
    }

    #[test]
    fn test_normalize_rejects_missing_scheme() {
        assert!(normalize_url("localhost:6334").is_err());
        assert!(normalize_url("://").is_err());
    }

    #[test]
    fn test_backend_construction() {
        let config = VectorStoreConfig::default();
        let backend = QdrantBackend::new(&config, 1536).unwrap();
        assert_eq!(backend.collection(), "knowledge_base");
    }
}
