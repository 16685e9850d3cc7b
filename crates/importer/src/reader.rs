use std::collections::HashMap;
use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader};
use chrono::{Duration, NaiveDate};

use crate::error::{ImportError, Result};

/// One untyped cell as surfaced by the tabular reader.
///
/// Spreadsheet cells carrying a date format come out as `Date`; CSV cells
/// that look numeric come out as `Number` (the reader applies dynamic typing
/// the same way a spreadsheet library would).
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Text(String),
    Number(f64),
    Date(NaiveDate),
    Empty,
}

impl CellValue {
    /// Display form of the cell, used for preview columns and symbol text.
    pub fn display(&self) -> String {
        match self {
            CellValue::Text(s) => s.trim().to_string(),
            CellValue::Number(n) => n.to_string(),
            CellValue::Date(d) => d.format("%Y-%m-%d").to_string(),
            CellValue::Empty => String::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }
}

/// Header row plus data rows keyed by column name. Column names are whatever
/// the source file carries; no schema is guaranteed at this point.
#[derive(Debug, Clone)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<HashMap<String, CellValue>>,
}

/// Read a tabular file into a `RawTable`. The kind is inferred from the
/// extension: `.csv` is parsed as CSV, `.xlsx`/`.xls` as a spreadsheet
/// (first sheet). Anything else, or a file the parser cannot open, is an
/// `UnsupportedFormat` hard stop with no partial result.
pub fn read_table(path: &Path) -> Result<RawTable> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "csv" => read_csv(path),
        "xlsx" | "xls" => read_workbook(path),
        other => Err(ImportError::UnsupportedFormat(format!(
            "unrecognized file extension '{}' for {}",
            other,
            path.display()
        ))),
    }
}

fn read_csv(path: &Path) -> Result<RawTable> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .map_err(|e| ImportError::UnsupportedFormat(format!("{}: {}", path.display(), e)))?;

    let headers: Vec<String> = rdr
        .headers()
        .map_err(|e| ImportError::UnsupportedFormat(format!("{}: {}", path.display(), e)))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for record in rdr.records() {
        let record =
            record.map_err(|e| ImportError::UnsupportedFormat(format!("{}: {}", path.display(), e)))?;

        let mut row = HashMap::new();
        for (idx, header) in headers.iter().enumerate() {
            if header.is_empty() {
                continue;
            }
            let field = record.get(idx).unwrap_or("");
            row.insert(header.clone(), csv_cell(field));
        }
        rows.push(row);
    }

    Ok(RawTable { headers, rows })
}

fn csv_cell(field: &str) -> CellValue {
    let trimmed = field.trim();
    if trimmed.is_empty() {
        return CellValue::Empty;
    }
    if let Ok(n) = trimmed.parse::<f64>() {
        return CellValue::Number(n);
    }
    CellValue::Text(trimmed.to_string())
}

fn read_workbook(path: &Path) -> Result<RawTable> {
    let mut workbook = open_workbook_auto(path)
        .map_err(|e| ImportError::UnsupportedFormat(format!("{}: {}", path.display(), e)))?;

    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| ImportError::UnsupportedFormat(format!("{}: workbook has no sheets", path.display())))?;

    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| ImportError::UnsupportedFormat(format!("{}: {}", path.display(), e)))?;

    let mut row_iter = range.rows();
    let headers: Vec<String> = match row_iter.next() {
        Some(first) => first
            .iter()
            .map(|c| c.to_string().trim().to_string())
            .collect(),
        None => {
            return Ok(RawTable {
                headers: Vec::new(),
                rows: Vec::new(),
            })
        }
    };

    let mut rows = Vec::new();
    for data_row in row_iter {
        let mut row = HashMap::new();
        for (idx, header) in headers.iter().enumerate() {
            if header.is_empty() {
                continue;
            }
            let cell = data_row.get(idx).map(sheet_cell).unwrap_or(CellValue::Empty);
            row.insert(header.clone(), cell);
        }
        // Trailing all-empty rows are common in exported workbooks.
        if row.values().all(|c| c.is_empty()) {
            continue;
        }
        rows.push(row);
    }

    Ok(RawTable { headers, rows })
}

fn sheet_cell(cell: &Data) -> CellValue {
    match cell {
        Data::Empty => CellValue::Empty,
        Data::String(s) => {
            if s.trim().is_empty() {
                CellValue::Empty
            } else {
                CellValue::Text(s.clone())
            }
        }
        Data::Float(f) => CellValue::Number(*f),
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Bool(b) => CellValue::Text(b.to_string()),
        Data::DateTime(dt) => match excel_serial_to_date(dt.as_f64()) {
            Some(d) => CellValue::Date(d),
            None => CellValue::Empty,
        },
        other => {
            let s = other.to_string();
            if s.trim().is_empty() {
                CellValue::Empty
            } else {
                CellValue::Text(s)
            }
        }
    }
}

/// Spreadsheet serial date conversion using the 1899-12-30 base (day 25569
/// is 1970-01-01).
pub fn excel_serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() {
        return None;
    }
    let days = serial.floor() as i64;
    let base = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    base.checked_add_signed(Duration::days(days))
}
