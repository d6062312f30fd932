use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{CoreError, Result};
use crate::table::Table;
#[cfg(feature = "pdf")]
use crate::table::detect_tables;
#[cfg(feature = "spreadsheet")]
use crate::table::HeaderRow;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    Pdf,
    Spreadsheet,
}

impl DocumentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::Pdf => "pdf",
            DocumentKind::Spreadsheet => "spreadsheet",
        }
    }

    /// Resolves a kind from a file name extension; `None` for anything
    /// other than `.pdf`, `.xlsx` and `.xls`.
    pub fn from_name(name: &str) -> Option<Self> {
        let ext = Path::new(name)
            .extension()
            .and_then(|e| e.to_str())?
            .to_lowercase();
        match ext.as_str() {
            "pdf" => Some(DocumentKind::Pdf),
            "xlsx" | "xls" => Some(DocumentKind::Spreadsheet),
            _ => None,
        }
    }
}

/// Text blocks and tables extracted from one uploaded file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedDocument {
    pub texts: Vec<String>,
    pub tables: Vec<Table>,
}

pub trait DocumentParser {
    fn parse(&self, bytes: &[u8], kind: DocumentKind) -> Result<ParsedDocument>;
}

#[derive(Debug)]
pub enum ParseOutcome {
    Parsed(ParsedDocument),
    UnsupportedType,
}

/// Parses an upload by its file name, reporting unknown extensions as
/// [`ParseOutcome::UnsupportedType`] instead of failing.
pub fn parse_upload<P: DocumentParser + ?Sized>(
    name: &str,
    bytes: &[u8],
    parser: &P,
) -> Result<ParseOutcome> {
    match DocumentKind::from_name(name) {
        Some(kind) => {
            debug!(file = name, kind = kind.as_str(), "parsing upload");
            parser.parse(bytes, kind).map(ParseOutcome::Parsed)
        }
        None => Ok(ParseOutcome::UnsupportedType),
    }
}

/// Parser backed by `pdf-extract` and `calamine`.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileParser;

impl DocumentParser for FileParser {
    fn parse(&self, bytes: &[u8], kind: DocumentKind) -> Result<ParsedDocument> {
        match kind {
            DocumentKind::Pdf => parse_pdf(bytes),
            DocumentKind::Spreadsheet => parse_spreadsheet(bytes),
        }
    }
}

/// One text block per non-blank page, plus any tables laid out in the
/// page text.
#[cfg(feature = "pdf")]
fn parse_pdf(bytes: &[u8]) -> Result<ParsedDocument> {
    let pages = pdf_extract::extract_text_from_mem_by_pages(bytes)
        .map_err(|e| CoreError::Pdf(e.to_string()))?;
    let mut parsed = ParsedDocument::default();
    for (idx, page) in pages.into_iter().enumerate() {
        if page.trim().is_empty() {
            debug!(page = idx + 1, "skipping blank page");
            continue;
        }
        parsed.tables.extend(detect_tables(&page));
        parsed.texts.push(page);
    }
    Ok(parsed)
}

#[cfg(not(feature = "pdf"))]
fn parse_pdf(_bytes: &[u8]) -> Result<ParsedDocument> {
    Err(CoreError::PdfSupportDisabled)
}

#[cfg(feature = "spreadsheet")]
fn parse_spreadsheet(bytes: &[u8]) -> Result<ParsedDocument> {
    use calamine::Reader;

    let cursor = std::io::Cursor::new(bytes);
    let mut workbook = calamine::open_workbook_auto_from_rs(cursor)
        .map_err(|e| CoreError::Spreadsheet(e.to_string()))?;
    let mut parsed = ParsedDocument::default();
    for sheet in workbook.sheet_names().to_vec() {
        let range = workbook
            .worksheet_range(&sheet)
            .map_err(|e| CoreError::Spreadsheet(format!("sheet {sheet}: {e}")))?;
        let raw = range
            .rows()
            .map(|row| row.iter().map(cell_to_string).collect())
            .collect();
        let table = Table::from_rows(raw, HeaderRow::First);
        if table.width() == 0 {
            debug!(sheet = sheet.as_str(), "skipping empty sheet");
            continue;
        }
        parsed.texts.push(table.to_text(&format!("Sheet: {sheet}"))?);
        parsed.tables.push(table);
    }
    Ok(parsed)
}

#[cfg(not(feature = "spreadsheet"))]
fn parse_spreadsheet(_bytes: &[u8]) -> Result<ParsedDocument> {
    Err(CoreError::SpreadsheetSupportDisabled)
}

#[cfg(feature = "spreadsheet")]
fn cell_to_string(cell: &calamine::Data) -> String {
    match cell {
        calamine::Data::Empty => String::new(),
        calamine::Data::String(s) => s.trim().to_string(),
        calamine::Data::Float(f) => f.to_string(),
        calamine::Data::Int(i) => i.to_string(),
        calamine::Data::Bool(b) => b.to_string(),
        calamine::Data::DateTime(dt) => dt.as_f64().to_string(),
        calamine::Data::DateTimeIso(s) | calamine::Data::DurationIso(s) => s.clone(),
        calamine::Data::Error(_) => String::new(),
    }
}
