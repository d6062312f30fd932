use finqa_core::CoreError;
use finqa_llm::LlmError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RagError {
    /// The embedding or chat service could not be reached or refused the call.
    #[error("inference service unavailable: {0}")]
    InferenceUnavailable(#[from] LlmError),
    #[error("failed to process {file}: {source}")]
    Parse {
        file: String,
        #[source]
        source: CoreError,
    },
    #[error("processing failed: {0}")]
    Processing(#[from] CoreError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl RagError {
    pub fn is_inference(&self) -> bool {
        matches!(self, RagError::InferenceUnavailable(_))
    }
}

pub type Result<T> = std::result::Result<T, RagError>;
