//! Embedding backfill for chunks stored without a vector.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use futures::stream::{self, TryStreamExt};
use serde::Serialize;

use super::embedding::Embedder;
use super::vector_store::VectorStore;
use crate::error::RagError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BackfillReport {
    pub pending: usize,
    pub embedded: usize,
}

#[derive(Clone)]
pub struct Backfill {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
    concurrency: usize,
}

impl Backfill {
    pub fn new(embedder: Arc<dyn Embedder>, store: Arc<dyn VectorStore>, concurrency: usize) -> Self {
        Self {
            embedder,
            store,
            concurrency: concurrency.max(1),
        }
    }

    /// Embed every chunk that has no embedding yet, at most `concurrency`
    /// at a time. `on_pending` gets the number of chunks found and
    /// `on_embedded` is called after each write.
    ///
    /// The first failure ends the pass; chunks already written keep their
    /// embeddings and the rest are picked up by the next run.
    pub async fn run<P, F>(&self, on_pending: P, on_embedded: F) -> Result<BackfillReport, RagError>
    where
        P: FnOnce(usize) + Send,
        F: Fn() + Send + Sync,
    {
        let start = Instant::now();
        let chunks = self.store.select_chunks_missing_embedding().await?;
        let pending = chunks.len();
        on_pending(pending);

        if pending == 0 {
            return Ok(BackfillReport::default());
        }
        tracing::info!(pending, concurrency = self.concurrency, "starting embedding backfill");

        let embedded = AtomicUsize::new(0);
        stream::iter(chunks.into_iter().map(Ok::<_, RagError>))
            .try_for_each_concurrent(self.concurrency, |chunk| {
                let embedded = &embedded;
                let on_embedded = &on_embedded;
                async move {
                    let vector = self.embedder.embed(&chunk.content).await?;
                    self.store.set_embedding(chunk.id, &vector).await?;
                    embedded.fetch_add(1, Ordering::Relaxed);
                    on_embedded();
                    Ok::<(), RagError>(())
                }
            })
            .await?;

        let embedded = embedded.into_inner();
        tracing::info!(
            embedded,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "embedding backfill complete"
        );
        Ok(BackfillReport { pending, embedded })
    }
}
