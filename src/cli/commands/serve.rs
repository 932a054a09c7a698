//! Serve command implementation.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;

use crate::models::Config;
use crate::server::{AppState, create_router};
use crate::services::{
    Embedder, HttpEmbedder, IngestionPipeline, QdrantBackend, TextChunker, VectorStore,
    spawn_sweeper,
};
use crate::storage::{BlobStore, DocumentStore, FsBlobStore, PgDocumentStore};

#[derive(Debug, Args)]
pub struct ServeArgs {
    #[arg(long, help = "Bind address (overrides config)")]
    pub host: Option<String>,

    #[arg(long, short = 'p', help = "Bind port (overrides config)")]
    pub port: Option<u16>,
}

pub async fn handle_serve(args: ServeArgs) -> Result<()> {
    let config = Config::load().context("failed to load configuration")?;

    let host = args.host.unwrap_or_else(|| config.server.host.clone());
    let port = args.port.unwrap_or(config.server.port);

    let store: Arc<dyn DocumentStore> = Arc::new(
        PgDocumentStore::connect(&config.database)
            .await
            .context("failed to connect to database")?,
    );
    tracing::info!("connected to database");

    let vectors: Arc<dyn VectorStore> = Arc::new(
        QdrantBackend::new(&config.vector_store, u64::from(config.embedding.dimension))
            .context("failed to configure vector store")?,
    );
    vectors
        .ensure_collection()
        .await
        .context("failed to ensure vector collection")?;
    tracing::info!(
        collection = config.vector_store.collection,
        dimension = config.embedding.dimension,
        "vector collection ready"
    );

    let embedder: Arc<dyn Embedder> = Arc::new(
        HttpEmbedder::new(&config.embedding).context("failed to configure embedding client")?,
    );

    let blobs: Option<Arc<dyn BlobStore>> = match &config.blob.dir {
        Some(dir) => {
            let store = FsBlobStore::new(dir).context("failed to open blob directory")?;
            tracing::info!(dir = %dir.display(), "blob store enabled");
            Some(Arc::new(store))
        }
        None => {
            tracing::info!("blob store not configured, durable copies disabled");
            None
        }
    };

    let pipeline = Arc::new(IngestionPipeline::new(
        Arc::clone(&store),
        Arc::clone(&vectors),
        embedder,
        blobs,
        TextChunker::new(&config.chunking),
    ));

    let sweeper = spawn_sweeper(Arc::clone(&store), config.sweeper.clone());
    if sweeper.is_some() {
        tracing::info!(
            interval_secs = config.sweeper.interval_secs,
            stale_after_secs = config.sweeper.stale_after_secs,
            "stale-document sweeper running"
        );
    }

    let state = AppState {
        store,
        vectors,
        pipeline,
        max_upload_bytes: config.server.max_upload_bytes,
    };
    let app = create_router(state);

    let addr: SocketAddr = format!("{host}:{port}")
        .parse()
        .with_context(|| format!("invalid bind address {host}:{port}"))?;
    tracing::info!(%addr, "listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
