//! HTTP API surface.
//!
//! Three document routes plus health. Authentication is an external
//! collaborator: an auth proxy in front of this service sets the
//! `x-user-id` header, and every handler scopes its work to that owner.

mod routes;

pub use routes::OWNER_HEADER;

use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::get;
use axum::routing::post;
use tower_http::trace::TraceLayer;

use crate::services::{IngestionPipeline, VectorStore};
use crate::storage::DocumentStore;

/// Shared handler state: injected collaborators, constructed once at
/// process start.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DocumentStore>,
    pub vectors: Arc<dyn VectorStore>,
    pub pipeline: Arc<IngestionPipeline>,
    pub max_upload_bytes: usize,
}

pub fn create_router(state: AppState) -> Router {
    // The handler enforces the exact configured cap with a typed error;
    // the layer is a slightly larger backstop so the handler gets to see
    // boundary-sized bodies.
    let body_limit = state.max_upload_bytes.saturating_add(1024);

    Router::new()
        .route("/documents/upload", post(routes::upload_document))
        .route(
            "/documents",
            get(routes::list_documents).delete(routes::delete_document),
        )
        .route("/health", get(routes::health_check))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
