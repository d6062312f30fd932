use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use tokio::runtime::Builder;
use tracing::debug;

pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";
pub const DEFAULT_EMBED_TIMEOUT: Duration = Duration::from_secs(120);
pub const DEFAULT_CHAT_TIMEOUT: Duration = Duration::from_secs(180);

#[derive(Error, Debug)]
pub enum LlmError {
    #[error("request to {endpoint} failed: {source}")]
    Unavailable {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{endpoint} returned {status}: {body}")]
    Status {
        endpoint: String,
        status: StatusCode,
        body: String,
    },
    #[error("failed to decode response from {endpoint}: {message}")]
    Decode { endpoint: String, message: String },
    #[error("failed to build http client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("failed to create tokio runtime: {0}")]
    Runtime(#[from] std::io::Error),
    #[error("unknown chat provider {0}")]
    UnknownProvider(String),
}

pub type Result<T> = std::result::Result<T, LlmError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct OllamaConfig {
    pub base_url: String,
    pub embed_timeout: Duration,
    pub chat_timeout: Duration,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            embed_timeout: DEFAULT_EMBED_TIMEOUT,
            chat_timeout: DEFAULT_CHAT_TIMEOUT,
        }
    }
}

/// Client for the two model-serving calls the pipeline needs.
///
/// Every call is a single attempt bounded by its timeout; there is no retry.
#[derive(Clone)]
pub struct OllamaClient {
    http: Client,
    config: OllamaConfig,
}

impl OllamaClient {
    pub fn new(config: OllamaConfig) -> Result<Self> {
        let http = Client::builder().build().map_err(LlmError::Client)?;
        Ok(Self { http, config })
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    /// Embeds one text. A response without an `embedding` field yields an
    /// empty vector.
    pub async fn embed(&self, text: &str, model: &str) -> Result<Vec<f32>> {
        let url = self.endpoint("api/embeddings");
        let payload = json!({ "model": model, "prompt": text });
        let parsed: EmbeddingResponse = self
            .post_json(&url, &payload, self.config.embed_timeout)
            .await?;
        let embedding = parsed.embedding.unwrap_or_default();
        debug!(model, dims = embedding.len(), "embedded text");
        Ok(embedding)
    }

    /// Non-streaming chat completion. A response without `message.content`
    /// yields an empty string.
    pub async fn chat(&self, model: &str, messages: &[ChatMessage]) -> Result<String> {
        let url = self.endpoint("api/chat");
        let payload = json!({
            "model": model,
            "messages": messages,
            "stream": false,
        });
        let parsed: ChatResponse = self
            .post_json(&url, &payload, self.config.chat_timeout)
            .await?;
        let content = parsed
            .message
            .and_then(|message| message.content)
            .unwrap_or_default();
        debug!(model, chars = content.len(), "chat completion received");
        Ok(content)
    }

    pub fn embed_blocking(&self, text: &str, model: &str) -> Result<Vec<f32>> {
        block_on(self.embed(text, model))
    }

    pub fn chat_blocking(&self, model: &str, messages: &[ChatMessage]) -> Result<String> {
        block_on(self.chat(model, messages))
    }

    async fn post_json<T>(&self, url: &str, payload: &serde_json::Value, timeout: Duration) -> Result<T>
    where
        T: for<'de> Deserialize<'de>,
    {
        let response = self
            .http
            .post(url)
            .timeout(timeout)
            .json(payload)
            .send()
            .await
            .map_err(|source| LlmError::Unavailable {
                endpoint: url.to_string(),
                source,
            })?;
        let status = response.status();
        let body = response.text().await.map_err(|source| LlmError::Unavailable {
            endpoint: url.to_string(),
            source,
        })?;
        if !status.is_success() {
            return Err(LlmError::Status {
                endpoint: url.to_string(),
                status,
                body,
            });
        }
        serde_json::from_str(&body).map_err(|e| LlmError::Decode {
            endpoint: url.to_string(),
            message: e.to_string(),
        })
    }
}

fn block_on<T>(future: impl std::future::Future<Output = Result<T>>) -> Result<T> {
    let rt = Builder::new_current_thread().enable_all().build()?;
    rt.block_on(future)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatProvider {
    Ollama,
    Local,
}

impl ChatProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatProvider::Ollama => "ollama",
            ChatProvider::Local => "local",
        }
    }

    pub fn parse(value: &str) -> Result<Self> {
        match value.trim().to_lowercase().as_str() {
            "ollama" => Ok(ChatProvider::Ollama),
            "local" => Ok(ChatProvider::Local),
            other => Err(LlmError::UnknownProvider(other.to_string())),
        }
    }
}

#[derive(Clone)]
enum ChatBackend {
    Ollama(OllamaClient),
    Local,
}

/// Chat capability bound to one model.
#[derive(Clone)]
pub struct LlmClient {
    provider: ChatProvider,
    model: String,
    backend: ChatBackend,
}

impl LlmClient {
    pub fn ollama(client: OllamaClient, model: impl Into<String>) -> Self {
        Self {
            provider: ChatProvider::Ollama,
            model: model.into(),
            backend: ChatBackend::Ollama(client),
        }
    }

    /// Offline client that answers with an extract of the supplied context.
    pub fn local() -> Self {
        Self {
            provider: ChatProvider::Local,
            model: "local".to_string(),
            backend: ChatBackend::Local,
        }
    }

    pub fn provider(&self) -> ChatProvider {
        self.provider
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub async fn chat(&self, messages: &[ChatMessage]) -> Result<String> {
        match &self.backend {
            ChatBackend::Ollama(client) => client.chat(&self.model, messages).await,
            ChatBackend::Local => Ok(synthesize_local_response(messages)),
        }
    }

    pub fn chat_blocking(&self, messages: &[ChatMessage]) -> Result<String> {
        match &self.backend {
            ChatBackend::Ollama(client) => client.chat_blocking(&self.model, messages),
            ChatBackend::Local => Ok(synthesize_local_response(messages)),
        }
    }
}

const LOCAL_NO_CONTEXT: &str = "I don't have enough information in the provided documents to answer that.";

fn synthesize_local_response(messages: &[ChatMessage]) -> String {
    let user = messages
        .iter()
        .rev()
        .find(|m| m.role == ChatRole::User)
        .map(|m| m.content.as_str())
        .unwrap_or_default();
    let context = extract_block(user, "Context:", "Extracted metrics");
    let summary = summarize_text(&context, 60);
    if summary.is_empty() {
        LOCAL_NO_CONTEXT.to_string()
    } else {
        summary
    }
}

fn extract_block(text: &str, start_marker: &str, stop_marker: &str) -> String {
    let Some(start_idx) = text.find(start_marker) else {
        return String::new();
    };
    let after = &text[start_idx + start_marker.len()..];
    match after.find(stop_marker) {
        Some(end_idx) => after[..end_idx].trim().to_string(),
        None => after.trim().to_string(),
    }
}

fn summarize_text(text: &str, max_words: usize) -> String {
    text.split_whitespace()
        .take(max_words)
        .collect::<Vec<&str>>()
        .join(" ")
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    #[serde(default)]
    embedding: Option<Vec<f32>>,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    message: Option<ChatReply>,
}

#[derive(Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}
