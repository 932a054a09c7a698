//! In-memory test doubles for the pipeline's collaborators.

#![allow(dead_code)]

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use uuid::Uuid;

use kbserve::error::{BlobError, EmbeddingError, StorageError, VectorStoreError};
use kbserve::models::{Document, DocumentStatus, NewDocument, StoredChunk};
use kbserve::services::{ChunkPoint, CollectionInfo, Embedder, ScoredChunk, VectorStore};
use kbserve::storage::{BlobStore, DocumentStore};

/// Deterministic embedder: each distinct input maps to a distinct
/// hash-derived unit vector, so order preservation is observable.
pub struct HashEmbedder {
    pub dimension: usize,
}

impl HashEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }

    pub fn vector_for(&self, text: &str) -> Vec<f32> {
        use std::hash::{DefaultHasher, Hash, Hasher};

        let mut vector = Vec::with_capacity(self.dimension);
        for i in 0..self.dimension {
            let mut hasher = DefaultHasher::new();
            (text, i).hash(&mut hasher);
            vector.push((hasher.finish() % 1000) as f32 / 1000.0 + 0.001);
        }

        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        for x in &mut vector {
            *x /= norm;
        }
        vector
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Ok(texts.iter().map(|t| self.vector_for(t)).collect())
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        Ok(self.vector_for(text))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

/// Embedder that fails every call with a permanent error.
pub struct FailingEmbedder;

#[async_trait]
impl Embedder for FailingEmbedder {
    async fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Err(EmbeddingError::ApiError {
            status: 401,
            body: "invalid api key".to_string(),
        })
    }

    async fn embed_query(&self, _text: &str) -> Result<Vec<f32>, EmbeddingError> {
        Err(EmbeddingError::ApiError {
            status: 401,
            body: "invalid api key".to_string(),
        })
    }

    fn dimension(&self) -> usize {
        8
    }
}

/// In-memory vector store that records every upsert batch and enforces
/// the owner filter the way the real backend does.
#[derive(Default)]
pub struct MemoryVectorStore {
    pub points: Mutex<Vec<ChunkPoint>>,
    pub upsert_batch_sizes: Mutex<Vec<usize>>,
    pub ensure_calls: AtomicUsize,
}

impl MemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn point_count(&self) -> usize {
        self.points.lock().unwrap().len()
    }

    pub fn points_for_document(&self, document_id: Uuid) -> Vec<ChunkPoint> {
        self.points
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.payload.document_id == document_id)
            .cloned()
            .collect()
    }
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

#[async_trait]
impl VectorStore for MemoryVectorStore {
    async fn health_check(&self) -> Result<bool, VectorStoreError> {
        Ok(true)
    }

    async fn collection_info(&self) -> Result<Option<CollectionInfo>, VectorStoreError> {
        Ok(Some(CollectionInfo {
            points_count: self.point_count() as u64,
        }))
    }

    async fn ensure_collection(&self) -> Result<(), VectorStoreError> {
        self.ensure_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn upsert_points(&self, points: Vec<ChunkPoint>) -> Result<(), VectorStoreError> {
        self.upsert_batch_sizes.lock().unwrap().push(points.len());
        let mut stored = self.points.lock().unwrap();
        for point in points {
            stored.retain(|p| p.id != point.id);
            stored.push(point);
        }
        Ok(())
    }

    async fn search(
        &self,
        query_vector: Vec<f32>,
        owner_id: &str,
        limit: u64,
        min_score: Option<f32>,
    ) -> Result<Vec<ScoredChunk>, VectorStoreError> {
        let mut hits: Vec<ScoredChunk> = self
            .points
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.payload.owner_id == owner_id)
            .map(|p| ScoredChunk {
                id: p.id.to_string(),
                score: cosine(&query_vector, &p.vector),
                payload: p.payload.clone(),
            })
            .filter(|hit| min_score.is_none_or(|floor| hit.score >= floor))
            .collect();

        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(limit as usize);
        Ok(hits)
    }

    async fn delete_by_document(&self, document_id: Uuid) -> Result<(), VectorStoreError> {
        self.points
            .lock()
            .unwrap()
            .retain(|p| p.payload.document_id != document_id);
        Ok(())
    }

    fn collection(&self) -> &str {
        "test_collection"
    }
}

/// Vector store whose upserts always fail with a permanent error.
#[derive(Default)]
pub struct FailingVectorStore;

#[async_trait]
impl VectorStore for FailingVectorStore {
    async fn health_check(&self) -> Result<bool, VectorStoreError> {
        Ok(false)
    }

    async fn collection_info(&self) -> Result<Option<CollectionInfo>, VectorStoreError> {
        Ok(None)
    }

    async fn ensure_collection(&self) -> Result<(), VectorStoreError> {
        Ok(())
    }

    async fn upsert_points(&self, _points: Vec<ChunkPoint>) -> Result<(), VectorStoreError> {
        Err(VectorStoreError::UpsertError("permanent failure".to_string()))
    }

    async fn search(
        &self,
        _query_vector: Vec<f32>,
        _owner_id: &str,
        _limit: u64,
        _min_score: Option<f32>,
    ) -> Result<Vec<ScoredChunk>, VectorStoreError> {
        Err(VectorStoreError::SearchError("permanent failure".to_string()))
    }

    async fn delete_by_document(&self, _document_id: Uuid) -> Result<(), VectorStoreError> {
        Err(VectorStoreError::DeleteError("permanent failure".to_string()))
    }

    fn collection(&self) -> &str {
        "test_collection"
    }
}

/// In-memory document store mirroring the Postgres implementation's
/// semantics, including the monotonic status guard.
#[derive(Default)]
pub struct MemoryDocumentStore {
    pub documents: Mutex<Vec<Document>>,
    pub chunks: Mutex<Vec<StoredChunk>>,
    pub chunk_batch_sizes: Mutex<Vec<usize>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.lock().unwrap().len()
    }

    pub fn chunks_for_document(&self, document_id: Uuid) -> Vec<StoredChunk> {
        let mut chunks: Vec<StoredChunk> = self
            .chunks
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.document_id == document_id)
            .cloned()
            .collect();
        chunks.sort_by_key(|c| c.chunk_index);
        chunks
    }

    pub fn status_of(&self, document_id: Uuid) -> Option<DocumentStatus> {
        self.documents
            .lock()
            .unwrap()
            .iter()
            .find(|d| d.id == document_id)
            .map(|d| d.status)
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn health_check(&self) -> Result<bool, StorageError> {
        Ok(true)
    }

    async fn insert_document(&self, new: NewDocument) -> Result<Document, StorageError> {
        let document = Document {
            id: Uuid::new_v4(),
            owner_id: new.owner_id,
            title: new.title,
            status: DocumentStatus::Processing,
            blob_location: None,
            size_bytes: new.size_bytes,
            content_type: new.content_type,
            created_at: Utc::now(),
        };
        self.documents.lock().unwrap().push(document.clone());
        Ok(document)
    }

    async fn update_document_status(
        &self,
        id: Uuid,
        status: DocumentStatus,
        blob_location: Option<String>,
    ) -> Result<(), StorageError> {
        let mut documents = self.documents.lock().unwrap();
        if let Some(doc) = documents
            .iter_mut()
            .find(|d| d.id == id && d.status == DocumentStatus::Processing)
        {
            doc.status = status;
            if blob_location.is_some() {
                doc.blob_location = blob_location;
            }
        }
        Ok(())
    }

    async fn get_document(
        &self,
        id: Uuid,
        owner_id: &str,
    ) -> Result<Option<Document>, StorageError> {
        Ok(self
            .documents
            .lock()
            .unwrap()
            .iter()
            .find(|d| d.id == id && d.owner_id == owner_id)
            .cloned())
    }

    async fn list_documents(&self, owner_id: &str) -> Result<Vec<Document>, StorageError> {
        let mut documents: Vec<Document> = self
            .documents
            .lock()
            .unwrap()
            .iter()
            .filter(|d| d.owner_id == owner_id)
            .cloned()
            .collect();
        documents.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(documents)
    }

    async fn insert_chunks(&self, chunks: &[StoredChunk]) -> Result<(), StorageError> {
        self.chunk_batch_sizes.lock().unwrap().push(chunks.len());
        self.chunks.lock().unwrap().extend_from_slice(chunks);
        Ok(())
    }

    async fn delete_document(&self, id: Uuid) -> Result<(), StorageError> {
        self.documents.lock().unwrap().retain(|d| d.id != id);
        self.chunks.lock().unwrap().retain(|c| c.document_id != id);
        Ok(())
    }

    async fn fail_stale_processing(&self, older_than: Duration) -> Result<u64, StorageError> {
        let cutoff = Utc::now() - older_than;
        let mut swept = 0;
        for doc in self.documents.lock().unwrap().iter_mut() {
            if doc.status == DocumentStatus::Processing && doc.created_at < cutoff {
                doc.status = DocumentStatus::Failed;
                swept += 1;
            }
        }
        Ok(swept)
    }
}

/// Blob store that always fails, for exercising the best-effort step.
pub struct FailingBlobStore;

#[async_trait]
impl BlobStore for FailingBlobStore {
    async fn store(&self, _name: &str, _bytes: &[u8]) -> Result<String, BlobError> {
        Err(BlobError::InvalidLocation("blob backend down".to_string()))
    }

    async fn delete(&self, _location: &str) -> Result<(), BlobError> {
        Err(BlobError::InvalidLocation("blob backend down".to_string()))
    }
}
