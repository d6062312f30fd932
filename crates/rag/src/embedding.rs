use finqa_core::{HashEmbedder, HashEmbedderConfig};
use finqa_llm::OllamaClient;
use tracing::debug;

use crate::error::Result;

#[derive(Clone)]
pub enum EmbeddingBackend {
    Hash(HashEmbedder),
    Ollama { client: OllamaClient, model: String },
}

/// Turns text into vectors, one request per text.
#[derive(Clone)]
pub struct EmbeddingClient {
    backend: EmbeddingBackend,
}

impl EmbeddingClient {
    pub fn ollama(client: OllamaClient, model: impl Into<String>) -> Self {
        Self {
            backend: EmbeddingBackend::Ollama {
                client,
                model: model.into(),
            },
        }
    }

    pub fn hash() -> Self {
        Self::hash_with(HashEmbedderConfig::default())
    }

    pub fn hash_with(config: HashEmbedderConfig) -> Self {
        Self {
            backend: EmbeddingBackend::Hash(HashEmbedder::new(config)),
        }
    }

    pub fn describe(&self) -> String {
        match &self.backend {
            EmbeddingBackend::Hash(embedder) => format!("hash ({} dims)", embedder.dimensions()),
            EmbeddingBackend::Ollama { client, model } => {
                format!("ollama {model} @ {}", client.base_url())
            }
        }
    }

    pub fn embed(&self, text: &str) -> Result<Vec<f32>> {
        match &self.backend {
            EmbeddingBackend::Hash(embedder) => Ok(embedder.embed_text(text)),
            EmbeddingBackend::Ollama { client, model } => Ok(client.embed_blocking(text, model)?),
        }
    }

    /// Embeds each input in order with a separate call. The first failure
    /// aborts the batch and nothing is returned.
    pub fn embed_batch(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(inputs.len());
        for (idx, text) in inputs.iter().enumerate() {
            out.push(self.embed(text)?);
            debug!(done = idx + 1, total = inputs.len(), "embedded chunk");
        }
        Ok(out)
    }
}
