mod config;
mod document;

pub use config::{
    BlobConfig, ChunkingConfig, Config, DatabaseConfig, DEFAULT_COLLECTION,
    DEFAULT_EMBEDDING_DIMENSION, DEFAULT_EMBEDDING_MODEL, DEFAULT_QDRANT_URL, EmbeddingConfig,
    RetrievalConfig, ServerConfig, SweeperConfig, VectorStoreConfig,
};
pub use document::{
    Document, DocumentStatus, NewDocument, RetrievedChunk, StoredChunk,
};
