use std::fmt;

/// Errors surfaced by the settlement calculator and summary builder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettlementError {
    /// Required columns are absent from the positions dataset.
    MissingColumns(Vec<String>),
    /// A row's valuation does not fit in i64 micros.
    Overflow {
        instrument_key: String,
        field: &'static str,
    },
}

impl fmt::Display for SettlementError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettlementError::MissingColumns(cols) => {
                write!(f, "Missing columns: {}", cols.join(", "))
            }
            SettlementError::Overflow {
                instrument_key,
                field,
            } => write!(
                f,
                "arithmetic overflow computing {field} for instrument '{instrument_key}'"
            ),
        }
    }
}

impl std::error::Error for SettlementError {}
