use serde::Serialize;
use tracing::{debug, warn};

use crate::embedding::EmbeddingClient;
use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredChunk {
    pub text: String,
    pub score: f32,
}

/// In-memory chunk store with one embedding vector per chunk.
///
/// `chunks` and `vectors` always have the same length; entries are only
/// ever appended.
pub struct EmbeddingIndex {
    embeddings: EmbeddingClient,
    chunks: Vec<String>,
    vectors: Vec<Vec<f32>>,
}

impl EmbeddingIndex {
    pub fn new(embeddings: EmbeddingClient) -> Self {
        Self {
            embeddings,
            chunks: Vec::new(),
            vectors: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn chunks(&self) -> &[String] {
        &self.chunks
    }

    pub fn vector_count(&self) -> usize {
        self.vectors.len()
    }

    pub fn dimensions(&self) -> Option<usize> {
        self.vectors.first().map(Vec::len)
    }

    /// Embeds and appends `docs`. All vectors are fetched before the index
    /// is touched, so a failed call leaves it unchanged.
    pub fn add_documents(&mut self, docs: &[String]) -> Result<()> {
        if docs.is_empty() {
            return Ok(());
        }
        let vectors = self.embeddings.embed_batch(docs)?;
        if let Some(expected) = self.dimensions() {
            if let Some(bad) = vectors.iter().find(|v| v.len() != expected) {
                warn!(expected, got = bad.len(), "embedding dimensionality changed");
            }
        }
        self.chunks.extend(docs.iter().cloned());
        self.vectors.extend(vectors);
        debug!(added = docs.len(), total = self.chunks.len(), "indexed chunks");
        Ok(())
    }

    /// Returns up to `top_k` chunks by descending cosine similarity to the
    /// query. Equal scores keep insertion order. An empty index yields an
    /// empty result without calling the embedder.
    pub fn search(&self, query: &str, top_k: usize) -> Result<Vec<ScoredChunk>> {
        if self.is_empty() || top_k == 0 {
            return Ok(Vec::new());
        }
        let query_vector = self.embeddings.embed(query)?;
        let mut hits: Vec<(usize, f32)> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(idx, vector)| (idx, cosine_similarity(&query_vector, vector)))
            .collect();
        hits.sort_by(|a, b| b.1.total_cmp(&a.1));
        hits.truncate(top_k);
        debug!(
            hits = hits.len(),
            best = hits.first().map(|h| h.1).unwrap_or_default(),
            "searched index"
        );
        Ok(hits
            .into_iter()
            .map(|(idx, score)| ScoredChunk {
                text: self.chunks[idx].clone(),
                score,
            })
            .collect())
    }
}

/// Cosine of the angle between `a` and `b`. Zero vectors and overflowing
/// inputs score 0.0, so the result is always finite.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let mut dot = 0.0f32;
    let mut a_norm = 0.0f32;
    let mut b_norm = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        a_norm += x * x;
        b_norm += y * y;
    }
    if a_norm == 0.0 || b_norm == 0.0 {
        return 0.0;
    }
    let cosine = dot / (a_norm.sqrt() * b_norm.sqrt());
    if cosine.is_finite() {
        cosine
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use finqa_llm::{OllamaClient, OllamaConfig};
    use std::time::Duration;

    fn docs(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn hash_index() -> EmbeddingIndex {
        EmbeddingIndex::new(EmbeddingClient::hash())
    }

    #[test]
    fn empty_index_search_is_empty_not_error() {
        let index = hash_index();
        assert!(index.search("anything", 5).unwrap().is_empty());
    }

    #[test]
    fn adding_nothing_is_a_no_op() {
        let mut index = hash_index();
        index.add_documents(&[]).unwrap();
        assert!(index.is_empty());
        assert_eq!(index.vector_count(), 0);
    }

    #[test]
    fn exact_text_ranks_first_with_unit_similarity() {
        let mut index = hash_index();
        index
            .add_documents(&docs(&[
                "Operating expenses rose to 1.2 million",
                "Revenue for fiscal 2024 was 5 million dollars",
                "The board approved a dividend",
            ]))
            .unwrap();
        let hits = index
            .search("Revenue for fiscal 2024 was 5 million dollars", 3)
            .unwrap();
        assert_eq!(hits[0].text, "Revenue for fiscal 2024 was 5 million dollars");
        assert!((hits[0].score - 1.0).abs() < 1e-5);
        for pair in hits.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
    }

    #[test]
    fn top_k_is_clamped_to_index_size() {
        let mut index = hash_index();
        index.add_documents(&docs(&["a b", "c d"])).unwrap();
        assert_eq!(index.search("a", 10).unwrap().len(), 2);
        assert_eq!(index.search("a", 1).unwrap().len(), 1);
        assert!(index.search("a", 0).unwrap().is_empty());
    }

    #[test]
    fn ties_keep_insertion_order() {
        let mut index = hash_index();
        index
            .add_documents(&docs(&["same words", "other", "same words"]))
            .unwrap();
        index.add_documents(&docs(&["same words"])).unwrap();
        let hits = index.search("same words", 4).unwrap();
        let texts: Vec<&str> = hits.iter().map(|h| h.text.as_str()).collect();
        assert_eq!(texts, vec!["same words", "same words", "same words", "other"]);
    }

    #[test]
    fn chunk_and_vector_counts_stay_equal() {
        let mut index = hash_index();
        for batch in [vec!["one"], vec![], vec!["two", "three", "four"]] {
            index.add_documents(&docs(&batch)).unwrap();
            assert_eq!(index.len(), index.vector_count());
        }
        assert_eq!(index.len(), 4);
    }

    #[test]
    fn failed_embedding_leaves_index_unchanged() {
        let client = OllamaClient::new(OllamaConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            embed_timeout: Duration::from_secs(5),
            chat_timeout: Duration::from_secs(5),
        })
        .unwrap();
        let mut index = EmbeddingIndex::new(EmbeddingClient::ollama(client, "nomic-embed-text"));
        let err = index.add_documents(&docs(&["revenue"])).unwrap_err();
        assert!(err.is_inference());
        assert!(index.is_empty());
        assert_eq!(index.vector_count(), 0);
    }

    #[test]
    fn cosine_handles_zero_vectors() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!((cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]) + 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_is_finite_for_overflowing_and_nan_inputs() {
        let huge = [f32::MAX, f32::MAX];
        assert_eq!(cosine_similarity(&huge, &huge), 0.0);
        assert_eq!(cosine_similarity(&[f32::NAN, 1.0], &[1.0, 1.0]), 0.0);
        assert_eq!(cosine_similarity(&[f32::INFINITY], &[1.0]), 0.0);
    }
}
