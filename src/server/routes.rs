//! Request handlers for the document API.

use axum::Json;
use axum::body::Bytes;
use axum::extract::{FromRequestParts, Query, State};
use axum::http::StatusCode;
use axum::http::request::Parts;
use axum::response::IntoResponse;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use super::AppState;
use crate::error::ApiError;
use crate::models::{Document, DocumentStatus, NewDocument};
use crate::services::IngestJob;

/// Header carrying the authenticated user id, set by the auth proxy.
pub const OWNER_HEADER: &str = "x-user-id";

/// Authenticated owner of the request.
pub struct OwnerId(pub String);

impl<S> FromRequestParts<S> for OwnerId
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(OWNER_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(|value| OwnerId(value.to_string()))
            .ok_or(ApiError::Unauthorized)
    }
}

#[derive(Debug, Deserialize)]
pub struct UploadParams {
    pub filename: Option<String>,
    #[serde(rename = "type")]
    pub content_type: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub id: Uuid,
    pub status: DocumentStatus,
}

/// Accept an upload: validate, create the `processing` row, schedule the
/// background ingestion, and return immediately. Callers poll the list
/// endpoint to learn the terminal state.
pub async fn upload_document(
    State(state): State<AppState>,
    OwnerId(owner_id): OwnerId,
    Query(params): Query<UploadParams>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let filename = params
        .filename
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .ok_or_else(|| ApiError::Validation("filename query parameter is required".to_string()))?
        .to_string();

    if body.is_empty() {
        return Err(ApiError::Validation("no file provided".to_string()));
    }
    if body.len() > state.max_upload_bytes {
        return Err(ApiError::PayloadTooLarge {
            size: body.len(),
            limit: state.max_upload_bytes,
        });
    }

    let content_type = params
        .content_type
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| "application/octet-stream".to_string());

    let document = state
        .store
        .insert_document(NewDocument {
            owner_id: owner_id.clone(),
            title: filename.clone(),
            size_bytes: body.len() as i64,
            content_type: content_type.clone(),
        })
        .await?;

    tracing::info!(
        document_id = %document.id,
        owner_id,
        size_bytes = body.len(),
        "upload accepted, scheduling ingestion"
    );

    // Detached: the handle is dropped and the task outlives this request
    let _ = state.pipeline.spawn(IngestJob {
        document_id: document.id,
        owner_id,
        title: filename,
        content_type,
        bytes: body.to_vec(),
    });

    Ok((
        StatusCode::ACCEPTED,
        Json(UploadResponse {
            id: document.id,
            status: DocumentStatus::Processing,
        }),
    ))
}

#[derive(Debug, Serialize)]
pub struct DocumentSummary {
    pub id: Uuid,
    pub title: String,
    pub status: DocumentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blob_location: Option<String>,
    pub size_bytes: i64,
    pub content_type: String,
    pub created_at: DateTime<Utc>,
}

impl From<Document> for DocumentSummary {
    fn from(doc: Document) -> Self {
        Self {
            id: doc.id,
            title: doc.title,
            status: doc.status,
            blob_location: doc.blob_location,
            size_bytes: doc.size_bytes,
            content_type: doc.content_type,
            created_at: doc.created_at,
        }
    }
}

/// The caller's documents with their current status, newest first.
pub async fn list_documents(
    State(state): State<AppState>,
    OwnerId(owner_id): OwnerId,
) -> Result<Json<Vec<DocumentSummary>>, ApiError> {
    let documents = state.store.list_documents(&owner_id).await?;
    Ok(Json(documents.into_iter().map(Into::into).collect()))
}

#[derive(Debug, Deserialize)]
pub struct DeleteParams {
    pub id: Uuid,
}

/// Delete a document everywhere: vector points, durable blob, relational
/// rows, in that order.
pub async fn delete_document(
    State(state): State<AppState>,
    OwnerId(owner_id): OwnerId,
    Query(params): Query<DeleteParams>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let document = state
        .store
        .get_document(params.id, &owner_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(params.id.to_string()))?;

    state.pipeline.delete_document(&document).await?;

    tracing::info!(document_id = %document.id, owner_id, "document deleted");
    Ok(Json(json!({ "deleted": true })))
}

pub async fn health_check(State(state): State<AppState>) -> Json<serde_json::Value> {
    let database = state.store.health_check().await.unwrap_or(false);
    let vector_store = state.vectors.health_check().await.unwrap_or(false);
    let status = if database && vector_store {
        "ok"
    } else {
        "degraded"
    };

    Json(json!({
        "status": status,
        "database": database,
        "vector_store": vector_store,
    }))
}
