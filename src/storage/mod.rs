//! Persistence collaborators: the relational document store and the
//! durable blob store.

mod blob;
mod postgres;

pub use blob::FsBlobStore;
pub use postgres::PgDocumentStore;

use async_trait::async_trait;
use chrono::Duration;
use uuid::Uuid;

use crate::error::{BlobError, StorageError};
use crate::models::{Document, DocumentStatus, NewDocument, StoredChunk};

/// Relational persistence for documents and their chunk rows.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Check that the database is reachable.
    async fn health_check(&self) -> Result<bool, StorageError>;

    /// Create a document row in `processing` state.
    async fn insert_document(&self, new: NewDocument) -> Result<Document, StorageError>;

    /// Move a document to a terminal status, optionally recording the
    /// blob location. Only `processing` rows are updated; terminal
    /// states never regress.
    async fn update_document_status(
        &self,
        id: Uuid,
        status: DocumentStatus,
        blob_location: Option<String>,
    ) -> Result<(), StorageError>;

    /// Fetch one document, scoped to its owner.
    async fn get_document(&self, id: Uuid, owner_id: &str)
    -> Result<Option<Document>, StorageError>;

    /// All of an owner's documents, newest first.
    async fn list_documents(&self, owner_id: &str) -> Result<Vec<Document>, StorageError>;

    /// Insert one bounded batch of chunk rows.
    async fn insert_chunks(&self, chunks: &[StoredChunk]) -> Result<(), StorageError>;

    /// Delete a document row; chunk rows cascade.
    async fn delete_document(&self, id: Uuid) -> Result<(), StorageError>;

    /// Reconciliation sweep: mark `processing` documents older than the
    /// cutoff as `failed`. Returns the number of rows swept.
    async fn fail_stale_processing(&self, older_than: Duration) -> Result<u64, StorageError>;
}

/// Durable raw-copy storage for uploaded files.
///
/// Optional at runtime: when unconfigured the ingestion pipeline skips
/// the copy step entirely.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Persist bytes under a name, returning the durable location.
    async fn store(&self, name: &str, bytes: &[u8]) -> Result<String, BlobError>;

    /// Remove a previously stored blob. Removing an absent blob is a
    /// no-op.
    async fn delete(&self, location: &str) -> Result<(), BlobError>;
}
