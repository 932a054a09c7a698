//! Status command implementation.

use anyhow::Result;

use crate::models::Config;
use crate::services::{QdrantBackend, VectorStore};
use crate::storage::{DocumentStore, PgDocumentStore};

pub async fn handle_status(verbose: bool) -> Result<()> {
    let config = Config::load()?;

    let (database_connected, database_error) =
        match PgDocumentStore::connect(&config.database).await {
            Ok(store) => (store.health_check().await.unwrap_or(false), None),
            Err(e) => (false, Some(e.to_string())),
        };

    let (vector_connected, points) =
        match QdrantBackend::new(&config.vector_store, u64::from(config.embedding.dimension)) {
            Ok(backend) => {
                let connected = backend.health_check().await.unwrap_or(false);
                let points = if connected {
                    backend
                        .collection_info()
                        .await
                        .ok()
                        .flatten()
                        .map_or(0, |info| info.points_count)
                } else {
                    0
                };
                (connected, points)
            }
            Err(_) => (false, 0),
        };

    println!("Database:     {}", if database_connected { "ok" } else { "unreachable" });
    if verbose && let Some(ref error) = database_error {
        println!("              {}", error);
    }
    println!(
        "Vector store: {} ({})",
        if vector_connected { "ok" } else { "unreachable" },
        config.vector_store.url
    );
    println!("Collection:   {} ({} points)", config.vector_store.collection, points);
    println!("Embedding:    {} ({})", config.embedding.model, config.embedding.url);

    if !database_connected || !vector_connected {
        eprintln!();
        if !database_connected {
            eprintln!("Warning: database not accessible. Check DATABASE_URL.");
        }
        if !vector_connected {
            eprintln!("Warning: Qdrant not running. Start with: docker compose up -d qdrant");
        }
    }

    Ok(())
}
