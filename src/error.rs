//! Error types for the knowledge-base service.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

use crate::utils::retry::Retryable;

/// Errors related to embedding operations.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("failed to connect to embedding API: {0}")]
    ConnectionError(String),

    #[error("embedding API error: status {status}: {body}")]
    ApiError { status: u16, body: String },

    #[error("embedding request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("invalid embedding response: {0}")]
    InvalidResponse(String),

    #[error("embedding count mismatch: sent {sent} inputs, received {received} vectors")]
    CountMismatch { sent: usize, received: usize },

    #[error("embedding dimension mismatch: collection expects {expected}, model returned {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("embedding timeout")]
    Timeout,
}

impl Retryable for EmbeddingError {
    fn is_retryable(&self) -> bool {
        match self {
            // Connection and timeout errors are retryable
            EmbeddingError::ConnectionError(_) | EmbeddingError::Timeout => true,
            // Throttling and upstream availability are transient
            EmbeddingError::ApiError { status, .. } => {
                matches!(status, 429 | 500 | 502 | 503 | 504)
            }
            // Request errors depend on the underlying cause
            EmbeddingError::RequestError(e) => e.is_timeout() || e.is_connect(),
            // A malformed or wrongly-shaped response is a deployment defect
            EmbeddingError::InvalidResponse(_)
            | EmbeddingError::CountMismatch { .. }
            | EmbeddingError::DimensionMismatch { .. } => false,
        }
    }
}

/// Errors related to vector store operations.
#[derive(Debug, Error)]
pub enum VectorStoreError {
    #[error("failed to connect to Qdrant: {0}")]
    ConnectionError(String),

    #[error("collection error: {0}")]
    CollectionError(String),

    #[error("upsert error: {0}")]
    UpsertError(String),

    #[error("search error: {0}")]
    SearchError(String),

    #[error("delete error: {0}")]
    DeleteError(String),

    #[error("vector store misconfigured: {0}")]
    ConfigError(String),

    #[error("vector store timeout")]
    Timeout,
}

impl Retryable for VectorStoreError {
    fn is_retryable(&self) -> bool {
        match self {
            VectorStoreError::ConnectionError(_) | VectorStoreError::Timeout => true,
            // A bad URL or dimension mismatch will not fix itself
            VectorStoreError::ConfigError(_) => false,
            // Other errors might be transient
            VectorStoreError::CollectionError(msg)
            | VectorStoreError::UpsertError(msg)
            | VectorStoreError::SearchError(msg)
            | VectorStoreError::DeleteError(msg) => {
                let msg_lower = msg.to_lowercase();
                msg_lower.contains("timeout")
                    || msg_lower.contains("connection")
                    || msg_lower.contains("unavailable")
                    || msg_lower.contains("too many")
            }
        }
    }
}

/// Errors produced while extracting text from an uploaded byte buffer.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("PDF extraction failed: {0}")]
    Pdf(String),

    #[error("file is not valid UTF-8: {0}")]
    InvalidUtf8(String),
}

/// Errors from the relational document store.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to connect to database: {0}")]
    ConnectionError(String),

    #[error("database query failed: {0}")]
    QueryError(#[from] sqlx::Error),

    #[error("schema setup failed: {0}")]
    SchemaError(String),
}

impl Retryable for StorageError {
    fn is_retryable(&self) -> bool {
        match self {
            StorageError::ConnectionError(_) => true,
            StorageError::QueryError(e) => {
                let msg = e.to_string().to_lowercase();
                msg.contains("timeout") || msg.contains("connection")
            }
            StorageError::SchemaError(_) => false,
        }
    }
}

/// Errors from the durable blob store.
#[derive(Debug, Error)]
pub enum BlobError {
    #[error("blob IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("invalid blob location: {0}")]
    InvalidLocation(String),
}

/// Errors raised during a document ingestion run.
///
/// Any of these marks the document `failed`; they never escape the
/// background task.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("extraction error: {0}")]
    Extract(#[from] ExtractError),

    #[error("embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("vector store error: {0}")]
    VectorStore(#[from] VectorStoreError),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Errors related to retrieval operations.
#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("vector store error: {0}")]
    VectorStore(#[from] VectorStoreError),

    #[error("invalid query: {0}")]
    InvalidQuery(String),
}

/// Errors related to configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParseError(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerializeError(#[from] toml::ser::Error),

    #[error("path error: {0}")]
    PathError(String),

    #[error("validation error: {0}")]
    ValidationError(String),
}

/// Errors surfaced by the HTTP API.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("payload too large: {size} bytes exceeds limit of {limit} bytes")]
    PayloadTooLarge { size: usize, limit: usize },

    #[error("missing or empty x-user-id header")]
    Unauthorized,

    #[error("document not found: {0}")]
    NotFound(String),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Storage(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = self.to_string();

        match &self {
            ApiError::Storage(_) | ApiError::Internal(_) => {
                tracing::error!(%message, "request failed");
            }
            _ => {
                tracing::debug!(%message, "client error");
            }
        }

        let body = Json(json!({
            "error": {
                "status": status.as_u16(),
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}
