#![cfg(all(feature = "pdf", feature = "spreadsheet"))]

use finqa_core::{extract_metrics, parse_upload, FileParser, ParseOutcome, ParsedDocument};

const REPORT_PDF: &[u8] = include_bytes!("fixtures/two_page_report.pdf");
const FINANCIALS_XLSX: &[u8] = include_bytes!("fixtures/financials.xlsx");

fn parsed(name: &str, bytes: &[u8]) -> ParsedDocument {
    match parse_upload(name, bytes, &FileParser).unwrap() {
        ParseOutcome::Parsed(doc) => doc,
        ParseOutcome::UnsupportedType => panic!("{name} should be supported"),
    }
}

#[test]
fn pdf_pages_stay_separate() {
    let doc = parsed("q3_report.pdf", REPORT_PDF);
    assert_eq!(doc.texts.len(), 2);
    assert!(doc.texts[0].contains("Revenue: 4,200,000"));
    assert!(!doc.texts[0].contains("Outlook"));
    assert!(doc.texts[1].contains("Outlook remains stable"));
    assert!(doc.texts[1].contains("Net income: 310 million"));
    assert!(doc.tables.is_empty());

    let metrics = extract_metrics(&doc.texts);
    assert_eq!(metrics.get("revenue"), Some("4200000"));
    assert_eq!(metrics.get("net_income"), Some("310000000"));
}

#[test]
fn workbook_cells_become_tables_and_text() {
    let doc = parsed("financials.xlsx", FINANCIALS_XLSX);
    // the empty "Notes" sheet contributes nothing
    assert_eq!(doc.texts.len(), 1);
    assert_eq!(doc.tables.len(), 1);
    assert!(doc.texts[0].starts_with("Sheet: Summary\n"));
    assert!(doc.texts[0].contains("Revenue\t5000000"));

    let table = &doc.tables[0];
    assert_eq!(table.columns, ["Metric", "FY2024"]);
    assert_eq!(table.rows.len(), 2);
    assert_eq!(table.rows[0], ["Revenue", "5000000"]);
    assert_eq!(table.rows[1], ["Operating expenses", "1200000"]);

    let metrics = extract_metrics(&doc.texts);
    assert_eq!(metrics.get("revenue"), Some("5000000"));
    assert_eq!(metrics.get("operating_expenses"), Some("1200000"));
}
