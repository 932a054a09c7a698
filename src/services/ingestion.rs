//! Document ingestion pipeline.
//!
//! One run per uploaded document: extract text, chunk, embed, upsert
//! vector points, persist chunk rows, finalize the document status.
//! Runs detached from the accepting request and always terminates in a
//! `completed` or `failed` status; nothing propagates out of the task.

use std::sync::Arc;
use std::time::Instant;

use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::error::{IngestError, StorageError};
use crate::extract::extract_text;
use crate::models::{Document, DocumentStatus, StoredChunk};
use crate::services::chunker::TextChunker;
use crate::services::embedding::Embedder;
use crate::services::vector_store::{ChunkPayload, ChunkPoint, VectorStore};
use crate::storage::{BlobStore, DocumentStore};
use crate::utils::retry::{RetryConfig, with_retry};

/// Points per acknowledged vector upsert call.
pub const VECTOR_BATCH_SIZE: usize = 50;

/// Chunk rows per relational insert call.
pub const CHUNK_ROW_BATCH_SIZE: usize = 500;

/// Work item handed to the pipeline by the upload handler.
#[derive(Debug, Clone)]
pub struct IngestJob {
    pub document_id: Uuid,
    pub owner_id: String,
    pub title: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

struct IngestOutcome {
    blob_location: Option<String>,
    chunk_count: usize,
}

/// Orchestrates the ingestion steps against injected collaborators.
pub struct IngestionPipeline {
    store: Arc<dyn DocumentStore>,
    vectors: Arc<dyn VectorStore>,
    embedder: Arc<dyn Embedder>,
    blobs: Option<Arc<dyn BlobStore>>,
    chunker: TextChunker,
    retry: RetryConfig,
}

impl IngestionPipeline {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        vectors: Arc<dyn VectorStore>,
        embedder: Arc<dyn Embedder>,
        blobs: Option<Arc<dyn BlobStore>>,
        chunker: TextChunker,
    ) -> Self {
        Self {
            store,
            vectors,
            embedder,
            blobs,
            chunker,
            retry: RetryConfig::default(),
        }
    }

    #[must_use]
    pub fn with_retry_config(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Detach an ingestion run from the request that accepted the upload.
    ///
    /// The returned handle is only needed by tests; the upload handler
    /// drops it and lets the task outlive the response.
    pub fn spawn(self: &Arc<Self>, job: IngestJob) -> JoinHandle<()> {
        let pipeline = Arc::clone(self);
        tokio::spawn(async move { pipeline.run(job).await })
    }

    /// Run one ingestion to its terminal status.
    ///
    /// Every failure is caught here and recorded as `failed`; the
    /// document row never stays `processing` on an error path.
    pub async fn run(&self, job: IngestJob) {
        let document_id = job.document_id;
        let start = Instant::now();

        match self.process(job).await {
            Ok(outcome) => {
                if let Err(e) = self
                    .store
                    .update_document_status(
                        document_id,
                        DocumentStatus::Completed,
                        outcome.blob_location,
                    )
                    .await
                {
                    tracing::error!(%document_id, error = %e, "failed to finalize document");
                    return;
                }
                tracing::info!(
                    %document_id,
                    chunks = outcome.chunk_count,
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "document ingested"
                );
            }
            Err(e) => {
                tracing::error!(%document_id, error = %e, "ingestion failed");
                if let Err(e) = self
                    .store
                    .update_document_status(document_id, DocumentStatus::Failed, None)
                    .await
                {
                    tracing::error!(%document_id, error = %e, "failed to mark document failed");
                }
            }
        }
    }

    async fn process(&self, job: IngestJob) -> Result<IngestOutcome, IngestError> {
        // 1. Extract. Unreadable content aborts before anything is written.
        let text = extract_text(&job.bytes, &job.content_type)?;

        // 2. Durable raw copy, best-effort: a blob failure must not fail
        //    the ingestion, the location just stays empty.
        let blob_location = match &self.blobs {
            Some(blobs) => match blobs.store(&job.title, &job.bytes).await {
                Ok(location) => Some(location),
                Err(e) => {
                    tracing::warn!(
                        document_id = %job.document_id,
                        error = %e,
                        "blob store failed, continuing without durable copy"
                    );
                    None
                }
            },
            None => None,
        };

        // 3. Chunk. An empty file produces zero chunks and still completes.
        let chunks = self.chunker.chunk(&text);
        if chunks.is_empty() {
            tracing::debug!(document_id = %job.document_id, "no chunks produced");
            return Ok(IngestOutcome {
                blob_location,
                chunk_count: 0,
            });
        }

        // 4. Embed the whole document in one logical batch. All-or-nothing:
        //    on failure no chunk rows and no points exist.
        let embeddings = with_retry(&self.retry, "embed_batch", || {
            self.embedder.embed_batch(&chunks)
        })
        .await?;

        // 5. Fresh point ids; payload carries the owner for filtered reads
        //    and the document id for filtered deletes.
        let points: Vec<ChunkPoint> = chunks
            .iter()
            .zip(embeddings)
            .enumerate()
            .map(|(index, (content, vector))| ChunkPoint {
                id: Uuid::new_v4(),
                vector,
                payload: ChunkPayload {
                    document_id: job.document_id,
                    chunk_index: index as i64,
                    content: content.clone(),
                    owner_id: job.owner_id.clone(),
                },
            })
            .collect();

        // Sequential acknowledged batches: batch N+1 is not issued until
        // batch N is durable, so a crash leaves a clean prefix indexed.
        for batch in points.chunks(VECTOR_BATCH_SIZE) {
            with_retry(&self.retry, "upsert_points", || {
                self.vectors.upsert_points(batch.to_vec())
            })
            .await?;
        }

        // 6. Chunk rows, indices matching the points exactly.
        let rows: Vec<StoredChunk> = chunks
            .into_iter()
            .enumerate()
            .map(|(index, content)| StoredChunk::new(job.document_id, index as i32, content))
            .collect();

        for batch in rows.chunks(CHUNK_ROW_BATCH_SIZE) {
            self.store.insert_chunks(batch).await?;
        }

        Ok(IngestOutcome {
            blob_location,
            chunk_count: rows.len(),
        })
    }

    /// Remove a document from every store: vector points first, then the
    /// durable blob, then the relational rows.
    ///
    /// The first two steps are best-effort; the relational delete is
    /// authoritative for whether the document is gone. Re-running the
    /// deletion cleans up whatever subset still exists, which is also the
    /// designed remediation for partial ingestion writes.
    pub async fn delete_document(&self, document: &Document) -> Result<(), StorageError> {
        if let Err(e) = self.vectors.delete_by_document(document.id).await {
            tracing::warn!(
                document_id = %document.id,
                error = %e,
                "vector delete failed, continuing"
            );
        }

        if let (Some(blobs), Some(location)) = (&self.blobs, &document.blob_location)
            && let Err(e) = blobs.delete(location).await
        {
            tracing::warn!(
                document_id = %document.id,
                error = %e,
                "blob delete failed, continuing"
            );
        }

        self.store.delete_document(document.id).await
    }
}
