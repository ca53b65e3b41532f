//! Document ingestion: text in, document and chunk rows out.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;

use super::chunker::TextChunker;
use super::vector_store::VectorStore;
use crate::error::RagError;
use crate::models::{IngestConfig, NewDocument};
use crate::utils::file::{collect_files, display_name, read_file_content};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub document_id: i64,
    pub title: Option<String>,
    pub chunks: usize,
}

#[derive(Clone)]
pub struct Ingestor {
    store: Arc<dyn VectorStore>,
    chunker: TextChunker,
    source: String,
    max_file_size: u64,
}

impl Ingestor {
    pub fn new(store: Arc<dyn VectorStore>, chunker: TextChunker, config: &IngestConfig) -> Self {
        Self {
            store,
            chunker,
            source: config.source.clone(),
            max_file_size: config.max_file_size,
        }
    }

    /// Insert a document and its chunks in one store write. Chunks are stored
    /// without embeddings; empty text yields a document with no chunks.
    pub async fn ingest_text(
        &self,
        document: &NewDocument,
        text: &str,
    ) -> Result<IngestReport, RagError> {
        let chunks = self.chunker.chunk(text);
        let document_id = self.store.insert_document(document, &chunks).await?;

        tracing::info!(
            document_id,
            chunks = chunks.len(),
            title = document.title.as_deref().unwrap_or(""),
            "ingested document"
        );

        Ok(IngestReport {
            document_id,
            title: document.title.clone(),
            chunks: chunks.len(),
        })
    }

    /// Read one UTF-8 file and ingest it under its file name.
    pub async fn ingest_file(&self, path: &Path) -> Result<IngestReport, RagError> {
        let text = read_file_content(path, self.max_file_size).map_err(|source| RagError::Io {
            path: path.display().to_string(),
            source,
        })?;

        let document = NewDocument::new(self.source.clone(), display_name(path));
        self.ingest_text(&document, &text).await
    }

    /// Files under `path` that `ingest_path` would ingest.
    pub fn files(&self, path: &Path, pattern: &str) -> Result<Vec<PathBuf>, RagError> {
        let pattern = glob::Pattern::new(pattern)
            .map_err(|e| RagError::invalid(format!("invalid pattern {pattern:?}: {e}")))?;

        collect_files(path, &pattern).map_err(|e| RagError::Io {
            path: e
                .path()
                .unwrap_or(path)
                .display()
                .to_string(),
            source: e.into(),
        })
    }

    /// Ingest a file, or every file under a directory whose name matches
    /// `pattern`. Stops at the first failure.
    pub async fn ingest_path(
        &self,
        path: &Path,
        pattern: &str,
    ) -> Result<Vec<IngestReport>, RagError> {
        let mut reports = Vec::new();
        for file in self.files(path, pattern)? {
            reports.push(self.ingest_file(&file).await?);
        }
        Ok(reports)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::vector_store::MemoryStore;
    use tempfile::TempDir;

    fn ingestor() -> (Ingestor, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new(3));
        let ingestor = Ingestor::new(store.clone(), TextChunker::new(800), &IngestConfig::default());
        (ingestor, store)
    }

    #[tokio::test]
    async fn test_1700_chars_become_three_ordered_chunks() {
        let (ingestor, store) = ingestor();
        let text: String = (0..1700)
            .map(|i| char::from(b'a' + (i % 26) as u8))
            .collect();

        let report = ingestor
            .ingest_text(&NewDocument::new("local", "long.txt"), &text)
            .await
            .unwrap();
        assert_eq!(report.chunks, 3);

        let chunks = store.list_chunks(report.document_id, None).await.unwrap();
        let lengths: Vec<usize> = chunks.iter().map(|c| c.content.chars().count()).collect();
        assert_eq!(lengths, vec![800, 800, 100]);
        assert!(chunks.windows(2).all(|w| w[0].id < w[1].id));

        let rebuilt: String = chunks.iter().map(|c| c.content.as_str()).collect();
        assert_eq!(rebuilt, text);

        let pending = store.select_chunks_missing_embedding().await.unwrap();
        assert_eq!(pending.len(), 3);
    }

    #[tokio::test]
    async fn test_empty_text_creates_document_without_chunks() {
        let (ingestor, store) = ingestor();
        let report = ingestor
            .ingest_text(&NewDocument::new("local", "empty.txt"), "")
            .await
            .unwrap();

        assert_eq!(report.chunks, 0);
        assert_eq!(store.list_documents().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_ingest_directory() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.txt"), "first match report").unwrap();
        std::fs::write(dir.path().join("b.txt"), "second match report").unwrap();
        std::fs::write(dir.path().join("skip.md"), "not ingested").unwrap();

        let (ingestor, store) = ingestor();
        let reports = ingestor.ingest_path(dir.path(), "*.txt").await.unwrap();

        let titles: Vec<&str> = reports.iter().filter_map(|r| r.title.as_deref()).collect();
        assert_eq!(titles, vec!["a.txt", "b.txt"]);

        let documents = store.list_documents().await.unwrap();
        assert_eq!(documents.len(), 2);
        assert!(documents.iter().all(|d| d.source == "local"));
    }

    #[tokio::test]
    async fn test_unreadable_file_reports_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing.txt");
        let (ingestor, _) = ingestor();

        match ingestor.ingest_file(&path).await {
            Err(RagError::Io { path: p, .. }) => assert!(p.ends_with("missing.txt")),
            other => panic!("expected io error, got {other:?}"),
        }
    }

    #[test]
    fn test_invalid_pattern() {
        let (ingestor, _) = ingestor();
        assert!(matches!(
            ingestor.files(Path::new("."), "[").unwrap_err(),
            RagError::InvalidRequest(_)
        ));
    }
}
