//! Vector index abstraction.
//!
//! One named collection holds every owner's points; isolation is
//! enforced per call through a mandatory owner filter. The trait exists
//! so the ingestion pipeline and retrieval service can be exercised
//! against an in-memory double.

mod qdrant;

pub use qdrant::QdrantBackend;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::VectorStoreError;

/// Payload attached to every stored point.
///
/// `owner_id` must always match the uploading user; every search filters
/// on it. `document_id` keys the filtered bulk delete.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkPayload {
    pub document_id: Uuid,
    pub chunk_index: i64,
    pub content: String,
    pub owner_id: String,
}

/// One (id, vector, payload) record destined for the index.
#[derive(Debug, Clone)]
pub struct ChunkPoint {
    /// Freshly generated per ingestion run, independent of the chunk row.
    pub id: Uuid,
    pub vector: Vec<f32>,
    pub payload: ChunkPayload,
}

/// A search hit, ranked by descending similarity.
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub id: String,
    pub score: f32,
    pub payload: ChunkPayload,
}

/// Collection statistics.
#[derive(Debug, Clone)]
pub struct CollectionInfo {
    pub points_count: u64,
}

/// Operations against the shared vector collection.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Check that the index is reachable.
    async fn health_check(&self) -> Result<bool, VectorStoreError>;

    /// Collection statistics, or `None` if the collection doesn't exist.
    async fn collection_info(&self) -> Result<Option<CollectionInfo>, VectorStoreError>;

    /// Idempotent create-if-absent for the collection and the payload
    /// indexes on `document_id` and `owner_id`. Safe to call repeatedly.
    async fn ensure_collection(&self) -> Result<(), VectorStoreError>;

    /// Write one batch of points, blocking until the backend acknowledges
    /// durability. Callers slice large point sets into bounded batches
    /// and issue them sequentially.
    async fn upsert_points(&self, points: Vec<ChunkPoint>) -> Result<(), VectorStoreError>;

    /// Similarity search scoped to a single owner. There is deliberately
    /// no unfiltered variant.
    async fn search(
        &self,
        query_vector: Vec<f32>,
        owner_id: &str,
        limit: u64,
        min_score: Option<f32>,
    ) -> Result<Vec<ScoredChunk>, VectorStoreError>;

    /// Payload-filtered bulk delete of every point belonging to a
    /// document. Idempotent: deleting an absent document is a no-op.
    async fn delete_by_document(&self, document_id: Uuid) -> Result<(), VectorStoreError>;

    /// The collection name this store operates on.
    fn collection(&self) -> &str;
}
