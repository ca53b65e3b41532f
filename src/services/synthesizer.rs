//! Context assembly and answer synthesis.

use std::sync::Arc;

use super::completion::{ChatMessage, Completer};
use super::retriever::Retriever;
use crate::error::RagError;
use crate::models::{Answer, ScoredChunk};

pub const SYSTEM_PROMPT: &str = "Answer using ONLY the provided context. \
If the answer isn't in the context, say you don't know.";

pub const CONTEXT_SEPARATOR: &str = "\n\n---\n\n";

/// Context block built from ranked sources.
#[derive(Debug, Clone, PartialEq)]
pub struct ContextBlock {
    pub text: String,
    /// Number of leading sources that made it into `text`.
    pub used: usize,
}

/// Join source contents in rank order, bounded by `max_chars` characters.
///
/// Whole sources are appended while they fit. The first one that does not fit
/// is cut to the remaining budget and assembly stops there.
pub fn build_context(sources: &[ScoredChunk], max_chars: usize) -> ContextBlock {
    let separator_len = CONTEXT_SEPARATOR.chars().count();
    let mut text = String::new();
    let mut remaining = max_chars;
    let mut used = 0;

    for source in sources {
        if used > 0 {
            if remaining <= separator_len {
                break;
            }
            text.push_str(CONTEXT_SEPARATOR);
            remaining -= separator_len;
        }

        let len = source.content.chars().count();
        if len <= remaining {
            text.push_str(&source.content);
            remaining -= len;
            used += 1;
            continue;
        }

        if remaining > 0 {
            text.extend(source.content.chars().take(remaining));
            used += 1;
        }
        break;
    }

    ContextBlock { text, used }
}

pub fn build_messages(question: &str, context: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(SYSTEM_PROMPT),
        ChatMessage::user(format!("QUESTION:\n{question}\n\nCONTEXT:\n{context}")),
    ]
}

#[derive(Clone)]
pub struct AnswerSynthesizer {
    retriever: Retriever,
    completer: Arc<dyn Completer>,
    max_context_chars: usize,
}

impl AnswerSynthesizer {
    pub fn new(
        retriever: Retriever,
        completer: Arc<dyn Completer>,
        max_context_chars: usize,
    ) -> Self {
        Self {
            retriever,
            completer,
            max_context_chars,
        }
    }

    /// Retrieve the top `k` chunks, ask the completion model to answer from
    /// them alone and return the trimmed reply with the sources used.
    ///
    /// An empty retrieval still calls the model with an empty context.
    pub async fn answer(
        &self,
        document_id: i64,
        question: &str,
        k: usize,
    ) -> Result<Answer, RagError> {
        let mut sources = self.retriever.retrieve(document_id, question, k).await?;

        let context = build_context(&sources, self.max_context_chars);
        if context.used < sources.len() {
            tracing::debug!(
                document_id,
                retrieved = sources.len(),
                used = context.used,
                "context truncated"
            );
            sources.truncate(context.used);
        }

        let messages = build_messages(question, &context.text);
        let reply = self.completer.complete(&messages).await?;

        Ok(Answer {
            answer: reply.trim().to_string(),
            sources,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewChunk, NewDocument};
    use crate::services::completion::Role;
    use crate::services::embedding::Embedder;
    use crate::services::testing::{FailingCompleter, KeywordEmbedder, RecordingCompleter};
    use crate::services::vector_store::{MemoryStore, VectorStore};

    fn scored(id: i64, content: &str) -> ScoredChunk {
        ScoredChunk {
            id,
            content: content.to_string(),
            distance: id as f64,
        }
    }

    #[test]
    fn test_context_joins_in_rank_order() {
        let sources = [scored(1, "alpha"), scored(2, "beta")];
        let context = build_context(&sources, 1000);

        assert_eq!(context.text, "alpha\n\n---\n\nbeta");
        assert_eq!(context.used, 2);
    }

    #[test]
    fn test_context_empty_sources() {
        let context = build_context(&[], 1000);
        assert_eq!(context.text, "");
        assert_eq!(context.used, 0);
    }

    #[test]
    fn test_context_cuts_first_overflowing_source() {
        let sources = [scored(1, "aaaa"), scored(2, "bbbbbbbbbb"), scored(3, "c")];
        // 4 + 7 (separator) + 3 of the second source.
        let context = build_context(&sources, 14);

        assert_eq!(context.text, "aaaa\n\n---\n\nbbb");
        assert_eq!(context.used, 2);
        assert_eq!(context.text.chars().count(), 14);
    }

    #[test]
    fn test_context_never_ends_with_separator() {
        let sources = [scored(1, "aaaa"), scored(2, "bbbb")];
        let context = build_context(&sources, 11);

        assert_eq!(context.text, "aaaa");
        assert_eq!(context.used, 1);
    }

    #[test]
    fn test_context_cut_respects_char_boundaries() {
        let sources = [scored(1, "ééééé")];
        let context = build_context(&sources, 3);
        assert_eq!(context.text, "ééé");
    }

    #[test]
    fn test_messages_template() {
        let messages = build_messages("Who won?", "Team A won 3-1.");

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::System);
        assert_eq!(messages[0].content, SYSTEM_PROMPT);
        assert_eq!(messages[1].role, Role::User);
        assert_eq!(
            messages[1].content,
            "QUESTION:\nWho won?\n\nCONTEXT:\nTeam A won 3-1."
        );
    }

    async fn synthesizer(
        completer: Arc<dyn Completer>,
        max_context_chars: usize,
    ) -> (AnswerSynthesizer, i64) {
        let embedder = Arc::new(KeywordEmbedder::new(&["score", "weather"]));
        let store = Arc::new(MemoryStore::new(2));
        let doc = store
            .insert_document(
                &NewDocument::new("local", "match.txt"),
                &[
                    NewChunk::new("The final score was 3-1."),
                    NewChunk::new("The weather was mild."),
                ],
            )
            .await
            .unwrap();
        for chunk in store.select_chunks_missing_embedding().await.unwrap() {
            let vector = embedder.embed(&chunk.content).await.unwrap();
            store.set_embedding(chunk.id, &vector).await.unwrap();
        }

        let retriever = Retriever::new(embedder, store, 50);
        (
            AnswerSynthesizer::new(retriever, completer, max_context_chars),
            doc,
        )
    }

    #[tokio::test]
    async fn test_answer_is_trimmed_and_cites_sources() {
        let completer = Arc::new(RecordingCompleter::new("  3-1 to the home side.\n"));
        let (synth, doc) = synthesizer(completer.clone(), 16_000).await;

        let answer = synth.answer(doc, "What was the score?", 5).await.unwrap();

        assert_eq!(answer.answer, "3-1 to the home side.");
        assert_eq!(answer.sources.len(), 2);
        assert_eq!(answer.sources[0].content, "The final score was 3-1.");

        let prompt = &completer.last_messages()[1].content;
        assert!(prompt.starts_with("QUESTION:\nWhat was the score?\n\nCONTEXT:\n"));
        assert!(prompt.ends_with("The final score was 3-1.\n\n---\n\nThe weather was mild."));
    }

    #[tokio::test]
    async fn test_answer_with_no_sources_still_asks() {
        let completer = Arc::new(RecordingCompleter::new("I don't know."));
        let (synth, _) = synthesizer(completer.clone(), 16_000).await;

        let answer = synth.answer(404, "What was the score?", 5).await.unwrap();

        assert_eq!(answer.answer, "I don't know.");
        assert!(answer.sources.is_empty());
        assert!(completer.last_messages()[1].content.ends_with("CONTEXT:\n"));
    }

    #[tokio::test]
    async fn test_sources_follow_context_cap() {
        let completer = Arc::new(RecordingCompleter::new("ok"));
        let (synth, doc) = synthesizer(completer, 10).await;

        let answer = synth.answer(doc, "score", 5).await.unwrap();
        assert_eq!(answer.sources.len(), 1);
        // Sources are returned whole even when the context holds a prefix.
        assert_eq!(answer.sources[0].content, "The final score was 3-1.");
    }

    #[tokio::test]
    async fn test_completion_failure_propagates() {
        let (synth, doc) = synthesizer(Arc::new(FailingCompleter), 16_000).await;

        assert!(matches!(
            synth.answer(doc, "score", 5).await,
            Err(RagError::Provider(_))
        ));
    }
}
