use finqa_core::FinancialMetrics;
use finqa_llm::{ChatMessage, LlmClient};
use tracing::{debug, info};

use crate::error::Result;
use crate::index::{EmbeddingIndex, ScoredChunk};

pub const NOT_READY_MESSAGE: &str = "Please upload and process documents first.";

pub const SYSTEM_PROMPT: &str = "You are a helpful financial analysis assistant. \
Answer using ONLY the provided context from the user's documents. \
If the answer isn't in the context, say you don't have enough information. \
Prefer numeric answers from tables when possible. Be concise.";

pub struct RagQuery {
    pub question: String,
    pub top_k: usize,
}

#[derive(Debug, Clone)]
pub struct RagAnswer {
    pub answer: String,
    pub retrieved: Vec<ScoredChunk>,
    pub messages: Vec<ChatMessage>,
}

#[derive(Debug, Clone)]
pub enum QueryOutcome {
    Answered(RagAnswer),
    NotReady,
}

impl QueryOutcome {
    /// Text shown to the user for this outcome.
    pub fn message(&self) -> &str {
        match self {
            QueryOutcome::Answered(answer) => &answer.answer,
            QueryOutcome::NotReady => NOT_READY_MESSAGE,
        }
    }
}

pub fn build_prompt<S: AsRef<str>>(
    question: &str,
    context: &[S],
    metrics: &FinancialMetrics,
) -> Vec<ChatMessage> {
    let context = context
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<&str>>()
        .join("\n\n");
    let user = format!(
        "Question: {question}\n\nContext:\n{context}\n\nExtracted metrics (may help):\n{}",
        metrics.to_pretty_json()
    );
    vec![ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user(user)]
}

/// Retrieves context for the question and asks the chat model. The model's
/// reply is returned untouched.
pub fn answer_question(
    index: Option<&EmbeddingIndex>,
    metrics: &FinancialMetrics,
    chat: &LlmClient,
    query: &RagQuery,
) -> Result<QueryOutcome> {
    let Some(index) = index else {
        return Ok(QueryOutcome::NotReady);
    };
    let retrieved = index.search(&query.question, query.top_k)?;
    debug!(
        retrieved = retrieved.len(),
        top_k = query.top_k,
        "retrieved context"
    );
    let context: Vec<&str> = retrieved.iter().map(|hit| hit.text.as_str()).collect();
    let messages = build_prompt(&query.question, &context, metrics);
    let answer = chat.chat_blocking(&messages)?;
    info!(
        model = chat.model(),
        context_chunks = retrieved.len(),
        answer_chars = answer.len(),
        "answered question"
    );
    Ok(QueryOutcome::Answered(RagAnswer {
        answer,
        retrieved,
        messages,
    }))
}
