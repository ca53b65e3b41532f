use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::{VectorStore, effective_filter};
use crate::error::StoreError;
use crate::models::{
    ChunkText, Document, NewChunk, NewDocument, ScoredChunk, StoreDriver, StoreStats,
};

#[derive(Debug, Clone)]
struct StoredChunk {
    document_id: i64,
    content: String,
    embedding: Option<Vec<f32>>,
}

#[derive(Debug, Default)]
struct State {
    documents: BTreeMap<i64, Document>,
    chunks: BTreeMap<i64, StoredChunk>,
    last_document_id: i64,
    last_chunk_id: i64,
}

/// Process-local store. Nothing survives a restart.
#[derive(Debug)]
pub struct MemoryStore {
    state: RwLock<State>,
    embedding_dim: usize,
}

impl MemoryStore {
    pub fn new(embedding_dim: usize) -> Self {
        Self {
            state: RwLock::new(State::default()),
            embedding_dim,
        }
    }

    fn check_dimension(&self, vector: &[f32]) -> Result<(), StoreError> {
        if vector.len() != self.embedding_dim {
            return Err(StoreError::Constraint(format!(
                "expected {} dimensions, not {}",
                self.embedding_dim,
                vector.len()
            )));
        }
        Ok(())
    }
}

fn euclidean_distance(a: &[f32], b: &[f32]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| {
            let d = f64::from(*x) - f64::from(*y);
            d * d
        })
        .sum::<f64>()
        .sqrt()
}

#[async_trait]
impl VectorStore for MemoryStore {
    async fn health_check(&self) -> Result<bool, StoreError> {
        Ok(true)
    }

    async fn initialize(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn insert_document(
        &self,
        document: &NewDocument,
        chunks: &[NewChunk],
    ) -> Result<i64, StoreError> {
        if chunks.iter().any(|c| c.content.is_empty()) {
            return Err(StoreError::Constraint(
                "chunk content must not be empty".to_string(),
            ));
        }

        let mut state = self.state.write().await;
        state.last_document_id += 1;
        let document_id = state.last_document_id;
        state.documents.insert(
            document_id,
            Document {
                id: document_id,
                source: document.source.clone(),
                title: document.title.clone(),
                url: document.url.clone(),
                created_at: Utc::now(),
            },
        );

        for chunk in chunks {
            state.last_chunk_id += 1;
            let id = state.last_chunk_id;
            state.chunks.insert(
                id,
                StoredChunk {
                    document_id,
                    content: chunk.content.clone(),
                    embedding: None,
                },
            );
        }

        Ok(document_id)
    }

    async fn select_chunks_missing_embedding(&self) -> Result<Vec<ChunkText>, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .chunks
            .iter()
            .filter(|(_, chunk)| chunk.embedding.is_none())
            .map(|(id, chunk)| ChunkText {
                id: *id,
                content: chunk.content.clone(),
            })
            .collect())
    }

    async fn set_embedding(&self, chunk_id: i64, embedding: &[f32]) -> Result<(), StoreError> {
        self.check_dimension(embedding)?;

        let mut state = self.state.write().await;
        if let Some(chunk) = state.chunks.get_mut(&chunk_id)
            && chunk.embedding.is_none()
        {
            chunk.embedding = Some(embedding.to_vec());
        }
        Ok(())
    }

    async fn list_chunks(
        &self,
        document_id: i64,
        filter: Option<&str>,
    ) -> Result<Vec<ChunkText>, StoreError> {
        let needle = effective_filter(filter).map(str::to_lowercase);
        let state = self.state.read().await;

        Ok(state
            .chunks
            .iter()
            .filter(|(_, chunk)| chunk.document_id == document_id)
            .filter(|(_, chunk)| {
                needle
                    .as_ref()
                    .is_none_or(|n| chunk.content.to_lowercase().contains(n.as_str()))
            })
            .map(|(id, chunk)| ChunkText {
                id: *id,
                content: chunk.content.clone(),
            })
            .collect())
    }

    async fn nearest_chunks(
        &self,
        document_id: i64,
        query: &[f32],
        k: usize,
    ) -> Result<Vec<ScoredChunk>, StoreError> {
        self.check_dimension(query)?;
        let state = self.state.read().await;

        let mut scored: Vec<ScoredChunk> = state
            .chunks
            .iter()
            .filter(|(_, chunk)| chunk.document_id == document_id)
            .filter_map(|(id, chunk)| {
                chunk.embedding.as_ref().map(|embedding| ScoredChunk {
                    id: *id,
                    content: chunk.content.clone(),
                    distance: euclidean_distance(embedding, query),
                })
            })
            .collect();

        // Chunks arrive in id order and the sort is stable, so ties stay by id.
        scored.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        scored.truncate(k);
        Ok(scored)
    }

    async fn list_documents(&self) -> Result<Vec<Document>, StoreError> {
        let state = self.state.read().await;
        Ok(state.documents.values().cloned().collect())
    }

    async fn delete_document(&self, document_id: i64) -> Result<bool, StoreError> {
        let mut state = self.state.write().await;
        if state.documents.remove(&document_id).is_none() {
            return Ok(false);
        }
        state
            .chunks
            .retain(|_, chunk| chunk.document_id != document_id);
        Ok(true)
    }

    async fn stats(&self) -> Result<StoreStats, StoreError> {
        let state = self.state.read().await;
        Ok(StoreStats {
            documents: state.documents.len() as u64,
            chunks: state.chunks.len() as u64,
            embedded_chunks: state
                .chunks
                .values()
                .filter(|c| c.embedding.is_some())
                .count() as u64,
        })
    }

    fn driver(&self) -> StoreDriver {
        StoreDriver::Memory
    }
}
