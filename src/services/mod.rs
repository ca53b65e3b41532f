mod backfill;
mod chunker;
mod completion;
mod embedding;
mod ingest;
mod retriever;
mod synthesizer;
pub mod vector_store;

#[cfg(test)]
pub(crate) mod testing;

use std::sync::Arc;

use anyhow::{Context, Result};

pub use backfill::{Backfill, BackfillReport};
pub use chunker::{TextChunker, split};
pub use completion::{ChatMessage, Completer, CompletionClient, Role};
pub use embedding::{Embedder, EmbeddingClient};
pub use ingest::{IngestReport, Ingestor};
pub use retriever::Retriever;
pub use synthesizer::{
    AnswerSynthesizer, CONTEXT_SEPARATOR, ContextBlock, SYSTEM_PROMPT, build_context,
    build_messages,
};
pub use vector_store::{MemoryStore, PgVectorStore, VectorStore, create_backend};

use crate::models::Config;
use crate::utils::retry::RetryPolicy;

/// The pipeline wired from one store and one pair of provider clients.
#[derive(Clone)]
pub struct RagService {
    store: Arc<dyn VectorStore>,
    ingestor: Ingestor,
    retriever: Retriever,
    synthesizer: AnswerSynthesizer,
    backfill: Backfill,
    default_k: usize,
}

impl RagService {
    pub fn new(
        store: Arc<dyn VectorStore>,
        embedder: Arc<dyn Embedder>,
        completer: Arc<dyn Completer>,
        config: &Config,
    ) -> Self {
        let chunker = TextChunker::from_config(&config.chunking);
        let retriever = Retriever::new(embedder.clone(), store.clone(), config.retrieval.max_k);

        Self {
            ingestor: Ingestor::new(store.clone(), chunker, &config.ingest),
            synthesizer: AnswerSynthesizer::new(
                retriever.clone(),
                completer,
                config.retrieval.max_context_chars,
            ),
            backfill: Backfill::new(embedder, store.clone(), config.backfill.concurrency),
            retriever,
            store,
            default_k: config.retrieval.default_k,
        }
    }

    /// Connect the configured store and build the provider clients.
    pub async fn from_config(config: &Config) -> Result<Self> {
        let store = create_backend(config)
            .await
            .context("failed to open vector store")?;
        let retry = RetryPolicy::from(&config.retry);

        let embedder = EmbeddingClient::new(&config.provider, &config.embedding, retry.clone())
            .context("failed to create embedding client")?;
        let completer = CompletionClient::new(&config.provider, &config.completion, retry)
            .context("failed to create completion client")?;

        Ok(Self::new(
            store,
            Arc::new(embedder),
            Arc::new(completer),
            config,
        ))
    }

    pub fn store(&self) -> &Arc<dyn VectorStore> {
        &self.store
    }

    pub fn ingestor(&self) -> &Ingestor {
        &self.ingestor
    }

    pub fn retriever(&self) -> &Retriever {
        &self.retriever
    }

    pub fn synthesizer(&self) -> &AnswerSynthesizer {
        &self.synthesizer
    }

    pub fn backfill(&self) -> &Backfill {
        &self.backfill
    }

    pub fn default_k(&self) -> usize {
        self.default_k
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewDocument;
    use crate::services::testing::{KeywordEmbedder, RecordingCompleter};

    #[tokio::test]
    async fn test_ingest_backfill_ask() {
        let mut config = Config::default();
        config.chunking.max_chars = 19;

        let embedder = Arc::new(KeywordEmbedder::new(&["score", "weather", "crowd"]));
        let store = Arc::new(MemoryStore::new(3));
        let completer = Arc::new(RecordingCompleter::new("It ended 2-0."));
        let service = RagService::new(store, embedder, completer, &config);

        let report = service
            .ingestor()
            .ingest_text(
                &NewDocument::new("local", "match.txt"),
                "The score was 2-0. Cold weather, loud.",
            )
            .await
            .unwrap();
        assert_eq!(report.chunks, 2);

        let backfilled = service.backfill().run(|_| {}, || {}).await.unwrap();
        assert_eq!(backfilled.embedded, 2);

        let answer = service
            .synthesizer()
            .answer(report.document_id, "final score?", service.default_k())
            .await
            .unwrap();
        assert_eq!(answer.answer, "It ended 2-0.");
        assert_eq!(answer.sources[0].content, "The score was 2-0. ");
    }

    #[tokio::test]
    async fn test_from_config_requires_api_key() {
        let mut config = Config::default();
        config.database.driver = crate::models::StoreDriver::Memory;

        let err = RagService::from_config(&config).await.err().unwrap();
        assert!(format!("{err:#}").contains("OPENAI_API_KEY"));
    }
}
