use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static PARAGRAPH_BREAK: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n\n+").expect("paragraph regex"));

pub const DEFAULT_MAX_CHARS: usize = 400;
const SEPARATOR: &str = "\n\n";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChunkConfig {
    pub max_chars: usize,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            max_chars: DEFAULT_MAX_CHARS,
        }
    }
}

pub struct Chunker {
    config: ChunkConfig,
}

impl Chunker {
    pub fn new(config: ChunkConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> ChunkConfig {
        self.config
    }

    pub fn chunk<S: AsRef<str>>(&self, texts: &[S]) -> Vec<String> {
        chunk_texts(texts, self.config.max_chars)
    }
}

/// Greedily packs blank-line separated paragraphs into chunks of at most
/// `max_chars` characters.
///
/// Chunks never span two input texts. A single paragraph longer than
/// `max_chars` is emitted as an oversized chunk rather than split.
pub fn chunk_texts<S: AsRef<str>>(texts: &[S], max_chars: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    for text in texts {
        let mut current = String::new();
        let mut current_len = 0usize;
        for part in PARAGRAPH_BREAK.split(text.as_ref()) {
            let part_len = part.chars().count();
            let separator = if current.is_empty() { 0 } else { SEPARATOR.len() };
            if current_len + separator + part_len > max_chars {
                flush(&mut chunks, &current);
                current = part.to_string();
                current_len = part_len;
            } else {
                current.push_str(&SEPARATOR[..separator]);
                current.push_str(part);
                current_len += separator + part_len;
            }
        }
        flush(&mut chunks, &current);
    }
    chunks
}

fn flush(chunks: &mut Vec<String>, buffer: &str) {
    let trimmed = buffer.trim();
    if !trimmed.is_empty() {
        chunks.push(trimmed.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packs_two_short_paragraphs_before_flushing() {
        let para = |c: char| std::iter::repeat(c).take(100).collect::<String>();
        let text = format!("{}\n\n{}\n\n{}", para('a'), para('b'), para('c'));
        let chunks = chunk_texts(&[text], 250);
        assert_eq!(chunks.len(), 2);
        assert!(chunks[0].starts_with(&para('a')));
        assert!(chunks[0].ends_with(&para('b')));
        assert_eq!(chunks[1], para('c'));
    }

    #[test]
    fn chunks_do_not_span_inputs() {
        let chunks = chunk_texts(&["alpha", "beta"], 1000);
        assert_eq!(chunks, vec!["alpha".to_string(), "beta".to_string()]);
    }

    #[test]
    fn oversized_paragraph_is_kept_whole() {
        let long = "x".repeat(900);
        let text = format!("intro\n\n{long}\n\noutro");
        let chunks = chunk_texts(&[text], 100);
        assert_eq!(chunks, vec!["intro".to_string(), long, "outro".to_string()]);
    }

    #[test]
    fn blank_input_produces_nothing() {
        let chunks = chunk_texts(&["", "   \n\n\n  "], 50);
        assert!(chunks.is_empty());
    }

    #[test]
    fn single_newlines_stay_inside_a_paragraph() {
        let chunks = chunk_texts(&["Revenue\t100\nCOGS\t40"], 5);
        assert_eq!(chunks, vec!["Revenue\t100\nCOGS\t40".to_string()]);
    }

    #[test]
    fn chunker_uses_configured_limit() {
        let chunker = Chunker::new(ChunkConfig { max_chars: 10 });
        let chunks = chunker.chunk(&["abcd\n\nefgh\n\nijkl"]);
        assert_eq!(chunks, vec!["abcd\n\nefgh".to_string(), "ijkl".to_string()]);
    }
}
