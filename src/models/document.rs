//! Document and chunk records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A persisted document. Immutable once ingested.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: i64,
    pub source: String,
    pub title: Option<String>,
    pub url: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Fields supplied when inserting a document.
#[derive(Debug, Clone, Default)]
pub struct NewDocument {
    pub source: String,
    pub title: Option<String>,
    pub url: Option<String>,
}

impl NewDocument {
    pub fn new(source: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            title: Some(title.into()),
            url: None,
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }
}

/// A chunk about to be inserted; its embedding is filled in later by backfill.
#[derive(Debug, Clone, PartialEq)]
pub struct NewChunk {
    pub content: String,
    pub metadata: Option<ChunkMetadata>,
}

impl NewChunk {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            metadata: None,
        }
    }
}

/// Position of a chunk within its document, counted in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub index: u32,
    pub char_start: u64,
    pub char_end: u64,
}

impl ChunkMetadata {
    pub fn to_json(self) -> serde_json::Value {
        serde_json::json!({
            "index": self.index,
            "char_start": self.char_start,
            "char_end": self.char_end,
        })
    }
}

/// A chunk's id and text, as listed for a document or selected for backfill.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkText {
    pub id: i64,
    pub content: String,
}

/// Row counts reported by a store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub documents: u64,
    pub chunks: u64,
    pub embedded_chunks: u64,
}

impl StoreStats {
    pub fn pending_chunks(&self) -> u64 {
        self.chunks.saturating_sub(self.embedded_chunks)
    }
}
