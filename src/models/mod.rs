mod config;
mod document;
mod search;

pub use config::{
    BackfillConfig, ChunkingConfig, CompletionConfig, Config, DEFAULT_BIND, DEFAULT_CHAT_MODEL,
    DEFAULT_EMBEDDING_DIMENSION, DEFAULT_EMBEDDING_MODEL, DEFAULT_MAX_CHARS, DEFAULT_PROVIDER_URL,
    DEFAULT_TOP_K, DatabaseConfig, EmbeddingConfig, IngestConfig, ProviderConfig,
    RetrievalConfig, RetryConfig, ServerConfig, StoreDriver,
};
pub use document::{ChunkMetadata, ChunkText, Document, NewChunk, NewDocument, StoreStats};
pub use search::{Answer, OutputFormat, ScoredChunk};
