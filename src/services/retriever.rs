//! Top-k chunk retrieval scoped to a single document.

use std::sync::Arc;
use std::time::Instant;

use super::embedding::Embedder;
use super::vector_store::VectorStore;
use crate::error::RagError;
use crate::models::ScoredChunk;

#[derive(Clone)]
pub struct Retriever {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
    max_k: usize,
}

impl Retriever {
    pub fn new(embedder: Arc<dyn Embedder>, store: Arc<dyn VectorStore>, max_k: usize) -> Self {
        Self {
            embedder,
            store,
            max_k,
        }
    }

    pub fn max_k(&self) -> usize {
        self.max_k
    }

    /// Embed `question` and return the `k` nearest embedded chunks of
    /// `document_id`, nearest first. A document with nothing embedded yields
    /// an empty list.
    pub async fn retrieve(
        &self,
        document_id: i64,
        question: &str,
        k: usize,
    ) -> Result<Vec<ScoredChunk>, RagError> {
        if k == 0 || k > self.max_k {
            return Err(RagError::invalid(format!(
                "k must be between 1 and {}",
                self.max_k
            )));
        }
        if question.trim().is_empty() {
            return Err(RagError::invalid("question must not be empty"));
        }

        let start = Instant::now();
        let embedding = self.embedder.embed(question).await?;
        let results = self
            .store
            .nearest_chunks(document_id, &embedding, k)
            .await?;

        tracing::debug!(
            document_id,
            k,
            results = results.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "retrieved chunks"
        );
        Ok(results)
    }
}
