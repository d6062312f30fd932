pub mod config;
pub mod embedding;
pub mod error;
pub mod index;
pub mod pipeline;
pub mod session;

pub use config::{EmbedProvider, Settings, DEFAULT_TOP_K, TOP_K_RANGE};
pub use embedding::{EmbeddingBackend, EmbeddingClient};
pub use error::{RagError, Result};
pub use index::{cosine_similarity, EmbeddingIndex, ScoredChunk};
pub use pipeline::{
    answer_question, build_prompt, QueryOutcome, RagAnswer, RagQuery, NOT_READY_MESSAGE,
    SYSTEM_PROMPT,
};
pub use session::{
    Conversation, IndexStatus, ProcessReport, Session, Speaker, Turn, Upload, TRANSCRIPT_WINDOW,
};
pub use finqa_llm::{ChatProvider, LlmClient};
