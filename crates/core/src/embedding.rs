use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use once_cell::sync::Lazy;
use regex::Regex;

static WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\p{L}\p{N}]+").expect("word regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashEmbedderConfig {
    pub dimensions: usize,
    pub seed: u64,
}

impl Default for HashEmbedderConfig {
    fn default() -> Self {
        Self {
            dimensions: 256,
            seed: 1337,
        }
    }
}

/// Offline feature-hashing embedder. Each lowercased word lands in one
/// signed bucket; the result is scaled to unit length unless it is all
/// zeros. Identical texts always produce identical vectors.
#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dimensions: usize,
    seed: u64,
}

impl HashEmbedder {
    pub fn new(config: HashEmbedderConfig) -> Self {
        Self {
            dimensions: config.dimensions.max(1),
            seed: config.seed,
        }
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut features = vec![0f32; self.dimensions];
        for word in WORD.find_iter(text) {
            let (slot, sign) = self.slot(&word.as_str().to_lowercase());
            features[slot] += sign;
        }
        let length = features.iter().map(|x| x * x).sum::<f32>().sqrt();
        if length > 0.0 {
            features.iter_mut().for_each(|x| *x /= length);
        }
        features
    }

    fn slot(&self, word: &str) -> (usize, f32) {
        let mut state = DefaultHasher::new();
        self.seed.hash(&mut state);
        word.hash(&mut state);
        let digest = state.finish();
        let sign = if digest >> 63 == 0 { 1.0 } else { -1.0 };
        ((digest % self.dimensions as u64) as usize, sign)
    }
}
