//! Vector store abstraction layer.
//!
//! Documents, their chunks and chunk embeddings live behind the [`VectorStore`]
//! trait. The PostgreSQL/pgvector backend is the production store; the
//! in-memory backend computes the same Euclidean ranking in process.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgVectorStore;

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::models::{
    ChunkText, Config, Document, NewChunk, NewDocument, ScoredChunk, StoreDriver, StoreStats,
};

/// Abstract trait for document, chunk and similarity operations.
///
/// Every method is its own unit of work; there are no cross-call transactions.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Check if the store is reachable.
    async fn health_check(&self) -> Result<bool, StoreError>;

    /// Create the extension, tables and indices if they don't exist.
    async fn initialize(&self) -> Result<(), StoreError>;

    /// Insert a document and its chunks, in order and without embeddings.
    /// Either the document and every chunk are written or nothing is.
    async fn insert_document(
        &self,
        document: &NewDocument,
        chunks: &[NewChunk],
    ) -> Result<i64, StoreError>;

    /// Every chunk whose embedding is unset, by ascending id.
    async fn select_chunks_missing_embedding(&self) -> Result<Vec<ChunkText>, StoreError>;

    /// Store a chunk's embedding. A chunk that already has one keeps it.
    async fn set_embedding(&self, chunk_id: i64, embedding: &[f32]) -> Result<(), StoreError>;

    /// Chunks of a document by ascending id, optionally restricted to those
    /// containing `filter` (case-insensitive).
    async fn list_chunks(
        &self,
        document_id: i64,
        filter: Option<&str>,
    ) -> Result<Vec<ChunkText>, StoreError>;

    /// The `k` embedded chunks of a document nearest to `query`, nearest first.
    async fn nearest_chunks(
        &self,
        document_id: i64,
        query: &[f32],
        k: usize,
    ) -> Result<Vec<ScoredChunk>, StoreError>;

    /// All documents by ascending id.
    async fn list_documents(&self) -> Result<Vec<Document>, StoreError>;

    /// Delete a document and, by cascade, its chunks. Returns whether it existed.
    async fn delete_document(&self, document_id: i64) -> Result<bool, StoreError>;

    async fn stats(&self) -> Result<StoreStats, StoreError>;

    fn driver(&self) -> StoreDriver;
}

/// Normalize an optional substring filter; blank filters mean "no filter".
pub(crate) fn effective_filter(filter: Option<&str>) -> Option<&str> {
    filter.filter(|f| !f.is_empty())
}

/// Create a store backend based on configuration.
pub async fn create_backend(config: &Config) -> anyhow::Result<Arc<dyn VectorStore>> {
    let dimension = config.embedding.dimension as usize;
    match config.database.driver {
        StoreDriver::PostgreSQL => {
            let url = config.database_url()?;
            let store = PgVectorStore::connect(url, &config.database, dimension).await?;
            Ok(Arc::new(store))
        }
        StoreDriver::Memory => Ok(Arc::new(MemoryStore::new(dimension))),
    }
}
