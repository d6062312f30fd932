use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::Result;

static COLUMN_GAP: Lazy<Regex> = Lazy::new(|| Regex::new(r" {2,}").expect("column gap regex"));
static RULE_CELL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[-=:+ ]+$").expect("rule cell regex"));

/// Minimum run of spaces that separates two columns of a text-layout row.
const MIN_COLUMN_GAP: usize = 2;

/// Whether the first retained row of a raw grid names the columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderRow {
    /// Always promote the first row.
    First,
    /// Promote the first row only when every cell in it is non-empty.
    IfComplete,
}

/// A rectangular grid of string cells with labelled columns.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    /// Builds a table from raw rows, dropping rows and columns that are
    /// entirely empty and padding ragged rows to the widest row.
    pub fn from_rows(raw: Vec<Vec<String>>, header: HeaderRow) -> Self {
        let width = raw.iter().map(Vec::len).max().unwrap_or(0);
        let mut grid: Vec<Vec<String>> = raw
            .into_iter()
            .map(|mut row| {
                row.resize(width, String::new());
                row
            })
            .filter(|row| row.iter().any(|cell| !is_blank(cell)))
            .collect();

        let keep: Vec<usize> = (0..width)
            .filter(|&col| grid.iter().any(|row| !is_blank(&row[col])))
            .collect();
        for row in grid.iter_mut() {
            *row = keep.iter().map(|&col| row[col].clone()).collect();
        }

        let promote = match header {
            HeaderRow::First => !grid.is_empty(),
            HeaderRow::IfComplete => {
                grid.len() > 1 && grid[0].iter().all(|cell| !is_blank(cell))
            }
        };
        let columns = if promote {
            grid.remove(0)
                .into_iter()
                .enumerate()
                .map(|(idx, label)| column_label(idx, &label))
                .collect()
        } else {
            (0..keep.len()).map(|idx| idx.to_string()).collect()
        };
        Self {
            columns,
            rows: grid,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    /// Header row followed by data rows, tab separated.
    pub fn to_tsv(&self) -> Result<String> {
        let mut writer = csv::WriterBuilder::new()
            .delimiter(b'\t')
            .quote_style(csv::QuoteStyle::Necessary)
            .from_writer(Vec::new());
        writer.write_record(&self.columns)?;
        for row in &self.rows {
            writer.write_record(row)?;
        }
        writer.flush()?;
        let bytes = writer
            .into_inner()
            .map_err(|e| crate::CoreError::Other(e.to_string()))?;
        Ok(String::from_utf8(bytes)?)
    }

    /// Textual projection used for retrieval: a title line then the TSV body.
    pub fn to_text(&self, title: &str) -> Result<String> {
        Ok(format!("{}\n{}", title, self.to_tsv()?))
    }
}

/// Finds tables in one page of extracted text.
///
/// A row is a line holding pipes, tabs or a run of spaces between at
/// least three words. Two or more consecutive rows with at least two cells
/// each form a table. The first row becomes the header only when none of
/// its cells is empty.
pub fn detect_tables(page: &str) -> Vec<Table> {
    let mut tables = Vec::new();
    let mut block: Vec<Vec<String>> = Vec::new();
    for line in page.lines() {
        match table_row(line) {
            Some(cells) if cells.iter().all(|c| RULE_CELL.is_match(c)) => {}
            Some(cells) => block.push(cells),
            None => close_block(&mut block, &mut tables),
        }
    }
    close_block(&mut block, &mut tables);
    tables
}

fn close_block(block: &mut Vec<Vec<String>>, tables: &mut Vec<Table>) {
    if block.len() >= 2 {
        let table = Table::from_rows(std::mem::take(block), HeaderRow::IfComplete);
        if table.width() > 1 {
            tables.push(table);
        }
    }
    block.clear();
}

fn table_row(line: &str) -> Option<Vec<String>> {
    let trimmed = line.trim();
    let cells: Vec<String> = if trimmed.contains('|') {
        trimmed
            .trim_matches('|')
            .split('|')
            .map(|c| c.trim().to_string())
            .collect()
    } else if trimmed.contains('\t') {
        trimmed.split('\t').map(|c| c.trim().to_string()).collect()
    } else if spaced_columns(trimmed) {
        COLUMN_GAP
            .split(trimmed)
            .map(|c| c.trim().to_string())
            .collect()
    } else {
        return None;
    };
    (cells.len() >= 2).then_some(cells)
}

fn spaced_columns(line: &str) -> bool {
    line.split_whitespace().count() >= 3 && longest_space_run(line) >= MIN_COLUMN_GAP
}

fn longest_space_run(line: &str) -> usize {
    line.split(|c: char| c != ' ')
        .map(str::len)
        .max()
        .unwrap_or(0)
}

fn is_blank(cell: &str) -> bool {
    cell.trim().is_empty()
}

fn column_label(idx: usize, label: &str) -> String {
    let trimmed = label.trim();
    if trimmed.is_empty() {
        idx.to_string()
    } else {
        trimmed.to_string()
    }
}
