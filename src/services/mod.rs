mod chunker;
mod embedding;
mod ingestion;
mod retrieval;
mod sweeper;
mod vector_store;

pub use chunker::TextChunker;
pub use embedding::{Embedder, HttpEmbedder};
pub use ingestion::{CHUNK_ROW_BATCH_SIZE, IngestJob, IngestionPipeline, VECTOR_BATCH_SIZE};
pub use retrieval::RetrievalService;
pub use sweeper::spawn_sweeper;
pub use vector_store::{
    ChunkPayload, ChunkPoint, CollectionInfo, QdrantBackend, ScoredChunk, VectorStore,
};
