//! Decoding of spreadsheet and CSV payloads into untyped text grids.

use std::io::Cursor;

use calamine::{Data, Reader, open_workbook_auto_from_rs};

use crate::data::error::{DataError, Result};

/// An untyped grid of text cells, title rows included.
///
/// Every cell is text: numbers are rendered with `f64`'s shortest
/// round-tripping representation, error cells (`#DIV/0!`) become empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawTable {
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn new(rows: Vec<Vec<String>>) -> Self {
        Self { rows }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.iter().all(|row| row.iter().all(|c| c.trim().is_empty()))
    }
}

/// Payload format, chosen from the file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableFormat {
    Workbook,
    Csv,
}

impl TableFormat {
    pub fn from_name(name: &str) -> Self {
        if name.to_ascii_lowercase().ends_with(".csv") {
            TableFormat::Csv
        } else {
            TableFormat::Workbook
        }
    }
}

/// Decode `bytes` as the given format.
pub fn read_table(bytes: Vec<u8>, format: TableFormat) -> Result<RawTable> {
    match format {
        TableFormat::Workbook => read_workbook(bytes),
        TableFormat::Csv => read_csv(&bytes),
    }
}

/// Read the first worksheet of an `.xls`/`.xlsx`/`.ods` workbook.
pub fn read_workbook(bytes: Vec<u8>) -> Result<RawTable> {
    if looks_like_html(&bytes) {
        return Err(DataError::Parse(
            "expected a spreadsheet but received an HTML page".to_string(),
        ));
    }

    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| DataError::Spreadsheet("workbook has no worksheet".to_string()))??;

    let rows = range
        .rows()
        .map(|row| row.iter().map(cell_text).collect())
        .collect();
    Ok(RawTable { rows })
}

/// Read a headerless CSV grid (the header is located later, like in a sheet).
pub fn read_csv(bytes: &[u8]) -> Result<RawTable> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(bytes);

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(str::to_string).collect());
    }
    Ok(RawTable { rows })
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty | Data::Error(_) => String::new(),
        Data::String(s) => s.clone(),
        Data::Float(v) => v.to_string(),
        Data::Int(v) => v.to_string(),
        Data::Bool(v) => v.to_string(),
        other => other.to_string(),
    }
}

fn looks_like_html(bytes: &[u8]) -> bool {
    let head: Vec<u8> = bytes
        .iter()
        .skip_while(|b| b.is_ascii_whitespace())
        .take(15)
        .map(|b| b.to_ascii_lowercase())
        .collect();
    head.starts_with(b"<!doctype") || head.starts_with(b"<html")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_grid_keeps_title_rows_and_ragged_lines() {
        let body = b"Date updated:,Jan-25\n\nIndustry Name,Number of firms,Beta\nBanking,10,0.9\n";
        let table = read_csv(body).unwrap();
        assert_eq!(table.rows.len(), 3);
        assert_eq!(table.rows[0], vec!["Date updated:", "Jan-25"]);
        assert_eq!(table.rows[2], vec!["Banking", "10", "0.9"]);
    }

    #[test]
    fn format_follows_extension() {
        assert_eq!(TableFormat::from_name("betas24.CSV"), TableFormat::Csv);
        assert_eq!(TableFormat::from_name("betas.xls"), TableFormat::Workbook);
    }

    #[test]
    fn html_error_pages_are_rejected() {
        let page = b"  <!DOCTYPE html><html><body>Not Found</body></html>".to_vec();
        assert!(matches!(read_workbook(page), Err(DataError::Parse(_))));
    }

    #[test]
    fn blank_grid_is_empty() {
        assert!(RawTable::new(vec![vec![" ".into(), String::new()]]).is_empty());
        assert!(!RawTable::new(vec![vec!["x".into()]]).is_empty());
    }
}
