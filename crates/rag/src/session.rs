use std::fs;
use std::path::Path;

use finqa_core::{
    chunk_texts, extract_metrics, parse_upload, DocumentParser, FinancialMetrics, ParseOutcome,
    Table,
};
use finqa_llm::LlmClient;
use serde::Serialize;
use tracing::{info, warn};

use crate::embedding::EmbeddingClient;
use crate::error::{RagError, Result};
use crate::index::EmbeddingIndex;
use crate::pipeline::{answer_question, QueryOutcome, RagQuery};

/// Number of turns shown in a transcript view.
pub const TRANSCRIPT_WINDOW: usize = 10;

/// An uploaded file: its name decides how it is parsed.
#[derive(Debug, Clone)]
pub struct Upload {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl Upload {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let bytes = fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self { name, bytes })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProcessReport {
    pub parsed: Vec<String>,
    pub skipped: Vec<String>,
    pub chunks: usize,
    pub tables: usize,
    pub metrics: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexStatus {
    Ready,
    NotReady,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Turn {
    pub speaker: Speaker,
    pub content: String,
}

#[derive(Debug, Clone, Default)]
pub struct Conversation {
    turns: Vec<Turn>,
}

impl Conversation {
    pub fn push(&mut self, speaker: Speaker, content: impl Into<String>) {
        self.turns.push(Turn {
            speaker,
            content: content.into(),
        });
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    /// The last `n` turns, oldest first.
    pub fn recent(&self, n: usize) -> &[Turn] {
        let start = self.turns.len().saturating_sub(n);
        &self.turns[start..]
    }
}

/// Everything one user works with: the current index, the chunked
/// documents, extracted tables and metrics, and the chat history.
#[derive(Default)]
pub struct Session {
    index: Option<EmbeddingIndex>,
    documents: Vec<String>,
    tables: Vec<Table>,
    metrics: FinancialMetrics,
    conversation: Conversation,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn status(&self) -> IndexStatus {
        if self.index.is_some() {
            IndexStatus::Ready
        } else {
            IndexStatus::NotReady
        }
    }

    pub fn index(&self) -> Option<&EmbeddingIndex> {
        self.index.as_ref()
    }

    pub fn documents(&self) -> &[String] {
        &self.documents
    }

    pub fn tables(&self) -> &[Table] {
        &self.tables
    }

    pub fn metrics(&self) -> &FinancialMetrics {
        &self.metrics
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    /// Parses, chunks and indexes `uploads`, replacing any previous index.
    ///
    /// Files with unsupported extensions are skipped. Nothing in the session
    /// changes unless the whole pass succeeds.
    pub fn process_documents<P: DocumentParser + ?Sized>(
        &mut self,
        uploads: &[Upload],
        parser: &P,
        embeddings: &EmbeddingClient,
        chunk_size: usize,
    ) -> Result<ProcessReport> {
        let mut report = ProcessReport::default();
        let mut texts = Vec::new();
        let mut tables = Vec::new();
        for upload in uploads {
            let outcome =
                parse_upload(&upload.name, &upload.bytes, parser).map_err(|source| {
                    RagError::Parse {
                        file: upload.name.clone(),
                        source,
                    }
                })?;
            match outcome {
                ParseOutcome::Parsed(doc) => {
                    info!(
                        file = %upload.name,
                        texts = doc.texts.len(),
                        tables = doc.tables.len(),
                        "parsed document"
                    );
                    texts.extend(doc.texts);
                    tables.extend(doc.tables);
                    report.parsed.push(upload.name.clone());
                }
                ParseOutcome::UnsupportedType => {
                    warn!(file = %upload.name, "unsupported file type, skipping");
                    report.skipped.push(upload.name.clone());
                }
            }
        }

        let chunks = chunk_texts(&texts, chunk_size);
        info!(texts = texts.len(), chunks = chunks.len(), chunk_size, "chunked text");

        let mut index = EmbeddingIndex::new(embeddings.clone());
        index.add_documents(&chunks)?;
        info!(
            chunks = index.len(),
            embedder = %embeddings.describe(),
            "built embedding index"
        );

        let metrics = extract_metrics(&chunks);
        report.chunks = chunks.len();
        report.tables = tables.len();
        report.metrics = metrics.len();

        self.index = Some(index);
        self.documents = chunks;
        self.tables = tables;
        self.metrics = metrics;
        Ok(report)
    }

    /// Answers `question` against the current index and records both turns.
    /// Returns `Ok(None)` for a blank question. A failed answer is recorded
    /// as an `Error: ...` assistant turn before the error is returned.
    pub fn ask(
        &mut self,
        question: &str,
        chat: &LlmClient,
        top_k: usize,
    ) -> Result<Option<QueryOutcome>> {
        let question = question.trim();
        if question.is_empty() {
            return Ok(None);
        }
        self.conversation.push(Speaker::User, question);
        let query = RagQuery {
            question: question.to_string(),
            top_k,
        };
        match answer_question(self.index.as_ref(), &self.metrics, chat, &query) {
            Ok(outcome) => {
                self.conversation.push(Speaker::Assistant, outcome.message());
                Ok(Some(outcome))
            }
            Err(err) => {
                self.conversation
                    .push(Speaker::Assistant, format!("Error: {err}"));
                Err(err)
            }
        }
    }
}
