//! Excel workbooks as header + string rows, so the CSV column logic applies
//! unchanged.
//!
//! Cells are rendered the way a CSV export would show them: integers and
//! floats without a trailing `.0`, date cells as `YYYY-MM-DD HH:MM:SS`, and
//! time-only cells as `HH:MM:SS`. Fully blank rows are dropped.

use std::fmt::Display;
use std::path::Path;

use calamine::{open_workbook_auto, Data, ExcelDateTime, Range, Reader, Sheets};
use csv::StringRecord;

use crate::error::IngestError;

const WORKBOOK_EXTENSIONS: [&str; 4] = ["xlsx", "xlsm", "xlsb", "xls"];

/// True when the extension names an Excel workbook (any case).
pub fn is_workbook(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| WORKBOOK_EXTENSIONS.iter().any(|w| e.eq_ignore_ascii_case(w)))
}

/// One worksheet; the first row is the header.
#[derive(Debug, Clone)]
pub(crate) struct Sheet {
    pub(crate) name: String,
    pub(crate) headers: StringRecord,
    pub(crate) rows: Vec<StringRecord>,
}

impl Sheet {
    fn from_range(name: String, range: &Range<Data>) -> Self {
        let mut rows = range
            .rows()
            .map(|cells| cells.iter().map(cell_text).collect::<StringRecord>());
        let headers = rows.next().unwrap_or_default();
        let rows = rows
            .filter(|r| r.iter().any(|c| !c.trim().is_empty()))
            .collect();
        Self {
            name,
            headers,
            rows,
        }
    }
}

fn workbook_error(path: &Path, e: impl Display) -> IngestError {
    IngestError::Io(format!("workbook '{}': {e}", path.display()))
}

fn open_book(path: &Path) -> Result<Sheets<std::io::BufReader<std::fs::File>>, IngestError> {
    open_workbook_auto(path).map_err(|e| workbook_error(path, e))
}

pub(crate) fn first_sheet(path: &Path) -> Result<Sheet, IngestError> {
    let mut book = open_book(path)?;
    let Some(name) = book.sheet_names().first().cloned() else {
        return Err(workbook_error(path, "no worksheets"));
    };
    let range = book
        .worksheet_range(&name)
        .map_err(|e| workbook_error(path, e))?;
    Ok(Sheet::from_range(name, &range))
}

/// Worksheets whose name contains `needle` (case-insensitive), in workbook
/// order.
pub(crate) fn sheets_named_like(path: &Path, needle: &str) -> Result<Vec<Sheet>, IngestError> {
    let mut book = open_book(path)?;
    let needle = needle.to_lowercase();
    let names: Vec<String> = book
        .sheet_names()
        .into_iter()
        .filter(|n| n.to_lowercase().contains(&needle))
        .collect();

    let mut out = Vec::with_capacity(names.len());
    for name in names {
        let range = book
            .worksheet_range(&name)
            .map_err(|e| workbook_error(path, e))?;
        out.push(Sheet::from_range(name, &range));
    }
    Ok(out)
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty | Data::Error(_) => String::new(),
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => f.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => date_cell_text(dt),
    }
}

fn date_cell_text(dt: &ExcelDateTime) -> String {
    match dt.as_datetime() {
        // time-of-day cells carry no date part
        Some(ts) if dt.as_f64() < 1.0 => ts.format("%H:%M:%S").to_string(),
        Some(ts) => ts.format("%Y-%m-%d %H:%M:%S%.f").to_string(),
        None => dt.as_f64().to_string(),
    }
}
