use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("pdf support not enabled")]
    PdfSupportDisabled,
    #[error("spreadsheet support not enabled")]
    SpreadsheetSupportDisabled,
    #[error("pdf extraction failed: {0}")]
    Pdf(String),
    #[error("spreadsheet parse failed: {0}")]
    Spreadsheet(String),
    #[error("unsupported input format: {0}")]
    UnsupportedInput(String),
    #[error("other: {0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, CoreError>;

impl From<std::string::FromUtf8Error> for CoreError {
    fn from(value: std::string::FromUtf8Error) -> Self {
        Self::Other(value.to_string())
    }
}
