mod chunk;
mod embedding;
mod error;
mod metrics;
mod parse;
mod table;

pub use chunk::{chunk_texts, ChunkConfig, Chunker, DEFAULT_MAX_CHARS};
pub use embedding::{HashEmbedder, HashEmbedderConfig};
pub use error::{CoreError, Result};
pub use metrics::{extract_metrics, normalize_number, FinancialMetrics, METRIC_NAMES};
pub use parse::{
    parse_upload, DocumentKind, DocumentParser, FileParser, ParseOutcome, ParsedDocument,
};
pub use table::{detect_tables, HeaderRow, Table};
