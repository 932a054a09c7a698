//! Postgres-backed document store.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use sqlx::Row;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use uuid::Uuid;

use super::DocumentStore;
use crate::error::StorageError;
use crate::models::{DatabaseConfig, Document, DocumentStatus, NewDocument, StoredChunk};

/// Document store on a Postgres connection pool.
///
/// Constructed once at process start and shared by reference; schema
/// setup is idempotent.
pub struct PgDocumentStore {
    pool: PgPool,
}

impl PgDocumentStore {
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, StorageError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(std::time::Duration::from_secs(config.connect_timeout_secs))
            .connect(&config.url)
            .await
            .map_err(|e| StorageError::ConnectionError(e.to_string()))?;

        let store = Self { pool };
        store.ensure_schema().await?;
        Ok(store)
    }

    async fn ensure_schema(&self) -> Result<(), StorageError> {
        let statements = [
            r#"
            CREATE TABLE IF NOT EXISTS documents (
                id UUID PRIMARY KEY,
                owner_id TEXT NOT NULL,
                title TEXT NOT NULL,
                status TEXT NOT NULL,
                blob_location TEXT,
                size_bytes BIGINT NOT NULL,
                content_type TEXT NOT NULL,
                created_at TIMESTAMPTZ NOT NULL
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS document_chunks (
                document_id UUID NOT NULL REFERENCES documents(id) ON DELETE CASCADE,
                chunk_index INTEGER NOT NULL,
                content TEXT NOT NULL,
                token_count INTEGER NOT NULL,
                PRIMARY KEY (document_id, chunk_index)
            )
            "#,
            "CREATE INDEX IF NOT EXISTS documents_owner_created_idx \
             ON documents (owner_id, created_at DESC)",
            "CREATE INDEX IF NOT EXISTS documents_status_idx ON documents (status)",
        ];

        for sql in statements {
            sqlx::query(sql)
                .execute(&self.pool)
                .await
                .map_err(|e| StorageError::SchemaError(e.to_string()))?;
        }

        Ok(())
    }
}

fn document_from_row(row: &PgRow) -> Result<Document, StorageError> {
    let status_str: String = row.try_get("status")?;
    let status: DocumentStatus = status_str.parse().map_err(StorageError::SchemaError)?;

    Ok(Document {
        id: row.try_get("id")?,
        owner_id: row.try_get("owner_id")?,
        title: row.try_get("title")?,
        status,
        blob_location: row.try_get("blob_location")?,
        size_bytes: row.try_get("size_bytes")?,
        content_type: row.try_get("content_type")?,
        created_at: row.try_get("created_at")?,
    })
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn health_check(&self) -> Result<bool, StorageError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map(|_| true)
            .map_err(|e| StorageError::ConnectionError(e.to_string()))
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

        sqlx::query(
            r#"
            INSERT INTO documents
                (id, owner_id, title, status, blob_location, size_bytes, content_type, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(document.id)
        .bind(&document.owner_id)
        .bind(&document.title)
        .bind(document.status.as_str())
        .bind(&document.blob_location)
        .bind(document.size_bytes)
        .bind(&document.content_type)
        .bind(document.created_at)
        .execute(&self.pool)
        .await?;

        Ok(document)
    }

    async fn update_document_status(
        &self,
        id: Uuid,
        status: DocumentStatus,
        blob_location: Option<String>,
    ) -> Result<(), StorageError> {
        // The status guard keeps transitions monotonic: a terminal row is
        // never rewritten, even by a late or duplicate finalizer.
        sqlx::query(
            r#"
            UPDATE documents
            SET status = $2, blob_location = COALESCE($3, blob_location)
            WHERE id = $1 AND status = 'processing'
            "#,
        )
        .bind(id)
        .bind(status.as_str())
        .bind(blob_location)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_document(
        &self,
        id: Uuid,
        owner_id: &str,
    ) -> Result<Option<Document>, StorageError> {
        let row = sqlx::query("SELECT * FROM documents WHERE id = $1 AND owner_id = $2")
            .bind(id)
            .bind(owner_id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(document_from_row).transpose()
    }

    async fn list_documents(&self, owner_id: &str) -> Result<Vec<Document>, StorageError> {
        let rows =
            sqlx::query("SELECT * FROM documents WHERE owner_id = $1 ORDER BY created_at DESC")
                .bind(owner_id)
                .fetch_all(&self.pool)
                .await?;

        rows.iter().map(document_from_row).collect()
    }

    async fn insert_chunks(&self, chunks: &[StoredChunk]) -> Result<(), StorageError> {
        if chunks.is_empty() {
            return Ok(());
        }

        let document_ids: Vec<Uuid> = chunks.iter().map(|c| c.document_id).collect();
        let indexes: Vec<i32> = chunks.iter().map(|c| c.chunk_index).collect();
        let contents: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let token_counts: Vec<i32> = chunks.iter().map(|c| c.token_count).collect();

        sqlx::query(
            r#"
            INSERT INTO document_chunks (document_id, chunk_index, content, token_count)
            SELECT * FROM UNNEST($1::uuid[], $2::int4[], $3::text[], $4::int4[])
            "#,
        )
        .bind(&document_ids)
        .bind(&indexes)
        .bind(&contents)
        .bind(&token_counts)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete_document(&self, id: Uuid) -> Result<(), StorageError> {
        // Chunk rows go with the document via ON DELETE CASCADE
        sqlx::query("DELETE FROM documents WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn fail_stale_processing(&self, older_than: Duration) -> Result<u64, StorageError> {
        let cutoff = Utc::now() - older_than;

        let result = sqlx::query(
            "UPDATE documents SET status = 'failed' WHERE status = 'processing' AND created_at < $1",
        )
        .bind(cutoff)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}
