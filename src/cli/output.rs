use serde::Serialize;
use serde_json::json;

use crate::models::{Answer, ChunkText, Document, OutputFormat, ScoredChunk, StoreStats};
use crate::services::{BackfillReport, IngestReport};

const PREVIEW_CHARS: usize = 200;

pub trait Formatter {
    fn format_documents(&self, documents: &[Document]) -> String;
    fn format_ingest(&self, reports: &[IngestReport]) -> String;
    fn format_backfill(&self, report: &BackfillReport) -> String;
    fn format_chunks(&self, document_id: i64, q: Option<&str>, chunks: &[ChunkText]) -> String;
    fn format_search(&self, document_id: i64, q: &str, k: usize, results: &[ScoredChunk])
    -> String;
    fn format_answer(&self, document_id: i64, question: &str, answer: &Answer) -> String;
    fn format_status(&self, status: &StatusInfo) -> String;
    fn format_message(&self, message: &str) -> String;
    fn format_error(&self, error: &str) -> String;
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusInfo {
    pub driver: String,
    pub connected: bool,
    pub stats: Option<StoreStats>,
    pub provider_url: String,
    pub api_key_set: bool,
    pub embedding_model: String,
    pub embedding_dimension: u32,
    pub completion_model: String,
}

fn preview(content: &str) -> String {
    let head: String = content.chars().take(PREVIEW_CHARS).collect();
    if content.chars().count() > PREVIEW_CHARS {
        format!("{head}...")
    } else {
        head
    }
}

fn indented(content: &str) -> Vec<String> {
    preview(content)
        .lines()
        .map(|line| format!("   {line}"))
        .collect()
}

pub struct TextFormatter;

impl Formatter for TextFormatter {
    fn format_documents(&self, documents: &[Document]) -> String {
        if documents.is_empty() {
            return "No documents.\n".to_string();
        }

        let mut lines = vec!["Documents".to_string(), "---------".to_string()];
        for doc in documents {
            lines.push(format!(
                "{:>6}  {:<24}  {}  ({})",
                doc.id,
                doc.title.as_deref().unwrap_or("-"),
                doc.created_at.format("%Y-%m-%d %H:%M"),
                doc.source
            ));
        }
        lines.join("\n") + "\n"
    }

    fn format_ingest(&self, reports: &[IngestReport]) -> String {
        let chunks: usize = reports.iter().map(|r| r.chunks).sum();
        let mut lines = vec!["Ingestion Complete".to_string(), "------------------".to_string()];
        for report in reports {
            lines.push(format!(
                "  #{} {} ({} chunks)",
                report.document_id,
                report.title.as_deref().unwrap_or("-"),
                report.chunks
            ));
        }
        lines.push(format!("Documents: {}", reports.len()));
        lines.push(format!("Chunks:    {chunks}"));
        lines.join("\n") + "\n"
    }

    fn format_backfill(&self, report: &BackfillReport) -> String {
        if report.pending == 0 {
            return "All chunks already have embeddings.\n".to_string();
        }
        format!("Embedded {} of {} pending chunks.\n", report.embedded, report.pending)
    }

    fn format_chunks(&self, document_id: i64, q: Option<&str>, chunks: &[ChunkText]) -> String {
        if chunks.is_empty() {
            return match q {
                Some(q) => format!("No chunks of document {document_id} contain \"{q}\".\n"),
                None => format!("Document {document_id} has no chunks.\n"),
            };
        }

        let mut lines = vec![format!(
            "{} chunk(s) of document {}",
            chunks.len(),
            document_id
        )];
        lines.push(String::new());
        for chunk in chunks {
            lines.push(format!("#{}", chunk.id));
            lines.extend(indented(&chunk.content));
            lines.push(String::new());
        }
        lines.join("\n")
    }

    fn format_search(
        &self,
        document_id: i64,
        q: &str,
        _k: usize,
        results: &[ScoredChunk],
    ) -> String {
        if results.is_empty() {
            return format!("No results in document {document_id} for: {q}\n");
        }

        let mut lines = vec![format!("Search results for: \"{q}\"")];
        lines.push(String::new());
        for (i, result) in results.iter().enumerate() {
            lines.push(format!(
                "{}. [Distance: {:.4}] #{}",
                i + 1,
                result.distance,
                result.id
            ));
            lines.extend(indented(&result.content));
            lines.push(String::new());
        }
        lines.join("\n")
    }

    fn format_answer(&self, _document_id: i64, _question: &str, answer: &Answer) -> String {
        let mut lines = vec![answer.answer.clone(), String::new()];
        if answer.sources.is_empty() {
            lines.push("Sources: none".to_string());
        } else {
            let ids: Vec<String> = answer.sources.iter().map(|s| format!("#{}", s.id)).collect();
            lines.push(format!("Sources: {}", ids.join(", ")));
        }
        lines.join("\n") + "\n"
    }

    fn format_status(&self, status: &StatusInfo) -> String {
        let mut lines = vec!["Status".to_string(), "------".to_string()];

        let connection = if status.connected {
            "[CONNECTED]"
        } else {
            "[DISCONNECTED]"
        };
        lines.push(format!("Store:       {} {}", status.driver, connection));
        if let Some(stats) = &status.stats {
            lines.push(format!("  Documents: {}", stats.documents));
            lines.push(format!("  Chunks:    {}", stats.chunks));
            lines.push(format!("  Embedded:  {}", stats.embedded_chunks));
            lines.push(format!("  Pending:   {}", stats.pending_chunks()));
        }
        lines.push(String::new());

        let key = if status.api_key_set { "set" } else { "not set" };
        lines.push(format!("Provider:    {} (API key {key})", status.provider_url));
        lines.push(format!(
            "  Embedding: {} ({} dims)",
            status.embedding_model, status.embedding_dimension
        ));
        lines.push(format!("  Chat:      {}", status.completion_model));
        lines.join("\n") + "\n"
    }

    fn format_message(&self, message: &str) -> String {
        format!("{message}\n")
    }

    fn format_error(&self, error: &str) -> String {
        format!("Error: {error}\n")
    }
}

pub struct JsonFormatter {
    pub pretty: bool,
}

impl JsonFormatter {
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }

    fn render<T: Serialize + ?Sized>(&self, value: &T) -> String {
        let rendered = if self.pretty {
            serde_json::to_string_pretty(value)
        } else {
            serde_json::to_string(value)
        };
        rendered.unwrap_or_else(|e| json!({"error": e.to_string()}).to_string())
    }
}

impl Formatter for JsonFormatter {
    fn format_documents(&self, documents: &[Document]) -> String {
        self.render(&json!({"documents": documents}))
    }

    fn format_ingest(&self, reports: &[IngestReport]) -> String {
        let chunks: usize = reports.iter().map(|r| r.chunks).sum();
        self.render(&json!({"documents": reports, "chunks": chunks}))
    }

    fn format_backfill(&self, report: &BackfillReport) -> String {
        self.render(report)
    }

    fn format_chunks(&self, document_id: i64, q: Option<&str>, chunks: &[ChunkText]) -> String {
        self.render(&json!({
            "document_id": document_id,
            "q": q,
            "count": chunks.len(),
            "chunks": chunks,
        }))
    }

    fn format_search(&self, document_id: i64, q: &str, k: usize, results: &[ScoredChunk]) -> String {
        self.render(&json!({
            "document_id": document_id,
            "q": q,
            "k": k,
            "results": results,
        }))
    }

    fn format_answer(&self, document_id: i64, question: &str, answer: &Answer) -> String {
        self.render(&json!({
            "document_id": document_id,
            "question": question,
            "answer": answer.answer,
            "sources": answer.sources,
        }))
    }

    fn format_status(&self, status: &StatusInfo) -> String {
        self.render(status)
    }

    fn format_message(&self, message: &str) -> String {
        json!({"message": message}).to_string()
    }

    fn format_error(&self, error: &str) -> String {
        json!({"error": error}).to_string()
    }
}

pub fn get_formatter(format: OutputFormat) -> Box<dyn Formatter> {
    match format {
        OutputFormat::Text => Box::new(TextFormatter),
        OutputFormat::Json => Box::new(JsonFormatter::new(true)),
    }
}
