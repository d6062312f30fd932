use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;

use finqa_core::DEFAULT_MAX_CHARS;
use finqa_llm::{
    ChatProvider, LlmClient, OllamaClient, OllamaConfig, DEFAULT_BASE_URL, DEFAULT_CHAT_TIMEOUT,
    DEFAULT_EMBED_TIMEOUT,
};
use serde::{Deserialize, Serialize};

use crate::embedding::EmbeddingClient;
use crate::error::{RagError, Result};

pub const DEFAULT_CHAT_MODEL: &str = "llama3.2";
pub const DEFAULT_EMBED_MODEL: &str = "nomic-embed-text";
pub const DEFAULT_TOP_K: usize = 5;
pub const TOP_K_RANGE: std::ops::RangeInclusive<usize> = 1..=20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbedProvider {
    Ollama,
    Hash,
}

impl EmbedProvider {
    pub fn parse(value: &str) -> Result<Self> {
        match value.trim().to_lowercase().as_str() {
            "ollama" => Ok(EmbedProvider::Ollama),
            "hash" => Ok(EmbedProvider::Hash),
            other => Err(RagError::Config(format!("unknown embedding provider {other}"))),
        }
    }
}

/// Runtime settings: `finqa.toml`, then `FINQA_*` environment variables,
/// then whatever the caller overrides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub ollama_url: String,
    pub chat_model: String,
    pub embed_model: String,
    pub top_k: usize,
    pub chunk_size: usize,
    pub chat_provider: ChatProvider,
    pub embed_provider: EmbedProvider,
    pub embed_timeout_secs: u64,
    pub chat_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            ollama_url: DEFAULT_BASE_URL.to_string(),
            chat_model: DEFAULT_CHAT_MODEL.to_string(),
            embed_model: DEFAULT_EMBED_MODEL.to_string(),
            top_k: DEFAULT_TOP_K,
            chunk_size: DEFAULT_MAX_CHARS,
            chat_provider: ChatProvider::Ollama,
            embed_provider: EmbedProvider::Ollama,
            embed_timeout_secs: DEFAULT_EMBED_TIMEOUT.as_secs(),
            chat_timeout_secs: DEFAULT_CHAT_TIMEOUT.as_secs(),
        }
    }
}

impl Settings {
    /// Reads the config file when it exists and applies environment
    /// overrides. A missing file is not an error.
    pub fn load(path: &Path) -> Result<Self> {
        let mut settings = if path.exists() {
            let contents = fs::read_to_string(path)?;
            Self::from_toml_str(&contents)?
        } else {
            Self::default()
        };
        settings.apply_env(|key| env::var(key).ok())?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        toml::from_str(contents).map_err(|e| RagError::Config(format!("invalid config: {e}")))
    }

    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("FINQA_OLLAMA_URL") {
            self.ollama_url = url;
        }
        if let Some(model) = lookup("FINQA_CHAT_MODEL") {
            self.chat_model = model;
        }
        if let Some(model) = lookup("FINQA_EMBED_MODEL") {
            self.embed_model = model;
        }
        if let Some(raw) = lookup("FINQA_TOP_K") {
            self.top_k = parse_number("FINQA_TOP_K", &raw)?;
        }
        if let Some(raw) = lookup("FINQA_CHUNK_SIZE") {
            self.chunk_size = parse_number("FINQA_CHUNK_SIZE", &raw)?;
        }
        if let Some(raw) = lookup("FINQA_CHAT_PROVIDER") {
            self.chat_provider =
                ChatProvider::parse(&raw).map_err(|e| RagError::Config(e.to_string()))?;
        }
        if let Some(raw) = lookup("FINQA_EMBED_PROVIDER") {
            self.embed_provider = EmbedProvider::parse(&raw)?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if !TOP_K_RANGE.contains(&self.top_k) {
            return Err(RagError::Config(format!(
                "top_k must be between {} and {}, got {}",
                TOP_K_RANGE.start(),
                TOP_K_RANGE.end(),
                self.top_k
            )));
        }
        if self.chunk_size == 0 {
            return Err(RagError::Config("chunk_size must be positive".to_string()));
        }
        Ok(())
    }

    pub fn ollama_config(&self) -> OllamaConfig {
        OllamaConfig {
            base_url: self.ollama_url.clone(),
            embed_timeout: Duration::from_secs(self.embed_timeout_secs),
            chat_timeout: Duration::from_secs(self.chat_timeout_secs),
        }
    }

    pub fn embedding_client(&self) -> Result<EmbeddingClient> {
        match self.embed_provider {
            EmbedProvider::Ollama => Ok(EmbeddingClient::ollama(
                OllamaClient::new(self.ollama_config())?,
                &self.embed_model,
            )),
            EmbedProvider::Hash => Ok(EmbeddingClient::hash()),
        }
    }

    pub fn chat_client(&self) -> Result<LlmClient> {
        match self.chat_provider {
            ChatProvider::Ollama => Ok(LlmClient::ollama(
                OllamaClient::new(self.ollama_config())?,
                &self.chat_model,
            )),
            ChatProvider::Local => Ok(LlmClient::local()),
        }
    }
}

fn parse_number(key: &str, raw: &str) -> Result<usize> {
    raw.trim()
        .parse()
        .map_err(|_| RagError::Config(format!("{key} must be a positive integer, got {raw:?}")))
}
