//! In-process fakes for the provider seams.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use super::completion::{ChatMessage, Completer};
use super::embedding::Embedder;
use crate::error::ProviderError;

/// One dimension per keyword: 1.0 when the text mentions it, else 0.0.
pub struct KeywordEmbedder {
    keywords: Vec<String>,
    calls: AtomicUsize,
}

impl KeywordEmbedder {
    pub fn new(keywords: &[&str]) -> Self {
        Self {
            keywords: keywords.iter().map(|k| k.to_lowercase()).collect(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Embedder for KeywordEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let text = text.to_lowercase();
        Ok(self
            .keywords
            .iter()
            .map(|k| if text.contains(k.as_str()) { 1.0 } else { 0.0 })
            .collect())
    }

    fn dimension(&self) -> usize {
        self.keywords.len()
    }
}

pub struct FailingEmbedder {
    dimension: usize,
}

impl FailingEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }
}

#[async_trait]
impl Embedder for FailingEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>, ProviderError> {
        Err(ProviderError::ServerError {
            status: 401,
            body: "invalid api key".to_string(),
        })
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

/// Replies with a fixed text and keeps the last prompt for inspection.
pub struct RecordingCompleter {
    reply: String,
    last: Mutex<Vec<ChatMessage>>,
}

impl RecordingCompleter {
    pub fn new(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
            last: Mutex::new(Vec::new()),
        }
    }

    pub fn last_messages(&self) -> Vec<ChatMessage> {
        self.last.lock().unwrap().clone()
    }
}

#[async_trait]
impl Completer for RecordingCompleter {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, ProviderError> {
        *self.last.lock().unwrap() = messages.to_vec();
        Ok(self.reply.clone())
    }
}

pub struct FailingCompleter;

#[async_trait]
impl Completer for FailingCompleter {
    async fn complete(&self, _messages: &[ChatMessage]) -> Result<String, ProviderError> {
        Err(ProviderError::ServerError {
            status: 500,
            body: "upstream unavailable".to_string(),
        })
    }
}
