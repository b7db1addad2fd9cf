use std::fmt;

/// Errors produced while reading broker and exchange CSV exports.
#[derive(Debug)]
pub enum IngestError {
    /// An I/O or CSV-library error.
    Io(String),
    /// The header row lacks required columns (all of them are named).
    MissingColumns(Vec<String>),
    /// A cell that must be numeric could not be parsed. `row` is 1-based and
    /// counts data rows only.
    ParseField {
        row: usize,
        column: String,
        raw: String,
    },
    /// A built-in pattern failed to compile.
    Pattern(String),
}

impl fmt::Display for IngestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IngestError::Io(msg) => write!(f, "csv io error: {msg}"),
            IngestError::MissingColumns(cols) => {
                write!(f, "Missing columns: {}", cols.join(", "))
            }
            IngestError::ParseField { row, column, raw } => write!(
                f,
                "csv row {row}: cannot parse column '{column}' from value '{raw}'"
            ),
            IngestError::Pattern(msg) => write!(f, "pattern error: {msg}"),
        }
    }
}

impl std::error::Error for IngestError {}

impl From<csv::Error> for IngestError {
    fn from(e: csv::Error) -> Self {
        IngestError::Io(e.to_string())
    }
}

impl From<regex::Error> for IngestError {
    fn from(e: regex::Error) -> Self {
        IngestError::Pattern(e.to_string())
    }
}

impl From<eod_settlement::SettlementError> for IngestError {
    fn from(e: eod_settlement::SettlementError) -> Self {
        match e {
            eod_settlement::SettlementError::MissingColumns(cols) => {
                IngestError::MissingColumns(cols)
            }
            other => IngestError::Io(other.to_string()),
        }
    }
}
