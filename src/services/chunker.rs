//! Fixed-size text chunking.

use crate::models::{ChunkMetadata, ChunkingConfig, NewChunk};

/// Split `text` into consecutive, non-overlapping windows of at most
/// `max_chars` characters. The last window may be shorter. Cuts never fall
/// inside a code point, and concatenating the windows yields `text` again.
///
/// A `max_chars` of zero is treated as one.
pub fn split(text: &str, max_chars: usize) -> Vec<&str> {
    let max_chars = max_chars.max(1);
    let mut windows = Vec::with_capacity(text.len() / max_chars + 1);
    let mut start = 0;

    for (count, (offset, _)) in text.char_indices().enumerate() {
        if count > 0 && count % max_chars == 0 {
            windows.push(&text[start..offset]);
            start = offset;
        }
    }

    if start < text.len() {
        windows.push(&text[start..]);
    }

    windows
}

/// Text chunker that produces insertable chunks with position metadata.
#[derive(Debug, Clone)]
pub struct TextChunker {
    max_chars: usize,
}

impl TextChunker {
    pub fn new(max_chars: usize) -> Self {
        Self {
            max_chars: max_chars.max(1),
        }
    }

    pub fn from_config(config: &ChunkingConfig) -> Self {
        Self::new(config.max_chars)
    }

    pub fn max_chars(&self) -> usize {
        self.max_chars
    }

    pub fn split<'a>(&self, text: &'a str) -> Vec<&'a str> {
        split(text, self.max_chars)
    }

    /// Chunk a document body, recording each window's character range.
    pub fn chunk(&self, text: &str) -> Vec<NewChunk> {
        let mut char_start = 0u64;

        self.split(text)
            .into_iter()
            .enumerate()
            .map(|(index, window)| {
                let char_end = char_start + window.chars().count() as u64;
                let metadata = ChunkMetadata {
                    index: index as u32,
                    char_start,
                    char_end,
                };
                char_start = char_end;
                NewChunk {
                    content: window.to_string(),
                    metadata: Some(metadata),
                }
            })
            .collect()
    }
}

impl Default for TextChunker {
    fn default() -> Self {
        Self::from_config(&ChunkingConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_text() {
        assert!(split("", 800).is_empty());
        assert!(TextChunker::default().chunk("").is_empty());
    }

    #[test]
    fn test_short_text_single_chunk() {
        assert_eq!(split("Hello, world!", 800), vec!["Hello, world!"]);
    }

    #[test]
    fn test_exact_multiple_has_no_trailing_chunk() {
        let text = "ab".repeat(400);
        let windows = split(&text, 400);
        assert_eq!(windows.len(), 2);
        assert!(windows.iter().all(|w| w.len() == 400));
    }

    #[test]
    fn test_1700_chars_yields_800_800_100() {
        let text: String = ('a'..='z').cycle().take(1700).collect();
        let windows = split(&text, 800);

        let lengths: Vec<usize> = windows.iter().map(|w| w.chars().count()).collect();
        assert_eq!(lengths, vec![800, 800, 100]);
        assert_eq!(windows.concat(), text);
    }

    #[test]
    fn test_concatenation_and_window_sizes() {
        let samples = [
            "a",
            "The quick brown fox jumps over the lazy dog.",
            "line one\nline two\n\nline four",
            "héllo wörld ✓ 日本語のテキスト 🚀🚀🚀",
        ];

        for text in samples {
            for max_chars in 1..=9 {
                let windows = split(text, max_chars);
                assert_eq!(windows.concat(), text);

                let (last, rest) = windows.split_last().unwrap();
                assert!(rest.iter().all(|w| w.chars().count() == max_chars));
                assert!((1..=max_chars).contains(&last.chars().count()));
            }
        }
    }

    #[test]
    fn test_multibyte_cut_on_char_boundary() {
        let windows = split("日本語テキスト", 3);
        assert_eq!(windows, vec!["日本語", "テキス", "ト"]);
    }

    #[test]
    fn test_deterministic() {
        let text = "Arsenal won the match 3-1 after a late rally.".repeat(50);
        assert_eq!(split(&text, 64), split(&text, 64));
    }

    #[test]
    fn test_zero_treated_as_one() {
        assert_eq!(split("abc", 0), vec!["a", "b", "c"]);
        assert_eq!(TextChunker::new(0).max_chars(), 1);
    }

    #[test]
    fn test_chunk_metadata_offsets() {
        let chunker = TextChunker::new(4);
        let chunks = chunker.chunk("ünïcode!!");

        let contents: Vec<&str> = chunks.iter().map(|c| c.content.as_str()).collect();
        assert_eq!(contents, vec!["ünïc", "ode!", "!"]);

        let ranges: Vec<(u32, u64, u64)> = chunks
            .iter()
            .map(|c| {
                let m = c.metadata.unwrap();
                (m.index, m.char_start, m.char_end)
            })
            .collect();
        assert_eq!(ranges, vec![(0, 0, 4), (1, 4, 8), (2, 8, 9)]);
    }
}
