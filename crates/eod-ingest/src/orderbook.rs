//! Broker order book export (CSV or Excel workbook) -> [`Execution`] values.
//!
//! ## Column contract (case-sensitive, order-independent)
//!
//! | Column                                 | Notes                                   |
//! |----------------------------------------|-----------------------------------------|
//! | `user_id`                              | account id                              |
//! | `order_status`                         | only `status_filter` rows are kept      |
//! | `order_side`                           | `BUY` / `SELL`, trimmed, any case       |
//! | `order_quantity`                       | decimal, > 0                            |
//! | `order_avg_price`                      | decimal, >= 0                           |
//! | `traiding_symbol` or `trading_symbol`  | instrument key                          |
//! | one or more timestamp columns          | first parseable value wins, day-first   |

use std::io::Read;
use std::path::Path;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use csv::StringRecord;
use eod_ledger::{Execution, Side};
use tracing::{debug, info};

use crate::decimal::{parse_micros, parse_qty};
use crate::error::IngestError;
use crate::table::{csv_reader, open, ColumnIndex};
use crate::workbook::{first_sheet, is_workbook};

pub const SYMBOL_COLUMNS: [&str; 2] = ["traiding_symbol", "trading_symbol"];

pub const DEFAULT_TIMESTAMP_COLUMNS: [&str; 3] =
    ["order_generated_time", "exchange_transact_time", "_date"];

const REQUIRED: [&str; 5] = [
    "user_id",
    "order_status",
    "order_side",
    "order_quantity",
    "order_avg_price",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBookOptions {
    pub status_filter: String,
    /// Tried in order; the first parseable value is the execution time.
    pub timestamp_columns: Vec<String>,
}

impl Default for OrderBookOptions {
    fn default() -> Self {
        Self {
            status_filter: "COMPLETE".to_string(),
            timestamp_columns: DEFAULT_TIMESTAMP_COLUMNS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

/// Row accounting for one order book read.
///
/// `rows_read = rows_ok + rows_rejected + rows_filtered`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestStats {
    pub rows_read: usize,
    pub rows_ok: usize,
    /// Bad quantity, price or timestamp, or no account / symbol.
    pub rows_rejected: usize,
    /// Other status, or a side that is not BUY/SELL.
    pub rows_filtered: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBook {
    pub executions: Vec<Execution>,
    pub stats: IngestStats,
}

const DATETIME_FORMATS: [&str; 12] = [
    "%d-%m-%Y %H:%M:%S%.f",
    "%d/%m/%Y %H:%M:%S%.f",
    "%d-%m-%Y %I:%M:%S %p",
    "%d/%m/%Y %I:%M:%S %p",
    "%d-%m-%Y %H:%M",
    "%d/%m/%Y %H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%d-%b-%Y %H:%M:%S%.f",
    "%d %b %Y %H:%M:%S%.f",
    "%d %b %Y %I:%M:%S %p",
    "%Y-%m-%d %H:%M",
];

const DATE_FORMATS: [&str; 5] = ["%d-%m-%Y", "%d/%m/%Y", "%Y-%m-%d", "%d-%b-%Y", "%d %b %Y"];

/// Day-first timestamp parsing; a bare date maps to midnight.
///
/// RFC 3339 values with `Z` or an offset keep their wall-clock time; the
/// offset itself is dropped.
pub fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return Some(ts.naive_local());
    }
    for f in DATETIME_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(s, f) {
            return Some(ts);
        }
    }
    for f in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, f) {
            return d.and_hms_opt(0, 0, 0);
        }
    }
    None
}

/// Order book from a CSV file or, for `.xlsx` / `.xls`, the first worksheet.
pub fn read_orderbook_path(path: &Path, opts: &OrderBookOptions) -> Result<OrderBook, IngestError> {
    let (book, source) = if is_workbook(path) {
        let sheet = first_sheet(path)?;
        debug!(sheet = %sheet.name, "order book worksheet");
        let cols = ColumnIndex::from_headers(&sheet.headers);
        (orderbook_from_rows(&cols, sheet.rows.into_iter().map(Ok), opts)?, "workbook")
    } else {
        (read_orderbook(open(path)?, opts)?, "csv")
    };
    info!(
        path = %path.display(),
        source,
        rows_read = book.stats.rows_read,
        rows_ok = book.stats.rows_ok,
        rows_rejected = book.stats.rows_rejected,
        rows_filtered = book.stats.rows_filtered,
        "order book loaded"
    );
    Ok(book)
}

/// Read executions from any CSV source.
///
/// Only header problems are errors; bad rows are counted and skipped.
pub fn read_orderbook<R: Read>(src: R, opts: &OrderBookOptions) -> Result<OrderBook, IngestError> {
    let mut rdr = csv_reader(src);
    let cols = ColumnIndex::from_headers(rdr.headers()?);
    orderbook_from_rows(&cols, rdr.into_records().map(|r| r.map_err(IngestError::from)), opts)
}

fn orderbook_from_rows<I>(
    cols: &ColumnIndex,
    rows: I,
    opts: &OrderBookOptions,
) -> Result<OrderBook, IngestError>
where
    I: Iterator<Item = Result<StringRecord, IngestError>>,
{
    let mut missing: Vec<String> = REQUIRED
        .iter()
        .filter(|c| !cols.has(c))
        .map(|c| c.to_string())
        .collect();
    let symbol_col = SYMBOL_COLUMNS.iter().copied().find(|c| cols.has(c));
    if symbol_col.is_none() {
        missing.push(SYMBOL_COLUMNS.join(" | "));
    }
    let ts_cols: Vec<&str> = opts
        .timestamp_columns
        .iter()
        .map(String::as_str)
        .filter(|c| cols.has(c))
        .collect();
    if ts_cols.is_empty() {
        missing.push(opts.timestamp_columns.join(" | "));
    }
    if !missing.is_empty() {
        return Err(IngestError::MissingColumns(missing));
    }
    let symbol_col = symbol_col.unwrap_or(SYMBOL_COLUMNS[0]);

    let mut stats = IngestStats::default();
    let mut executions = Vec::new();

    for (seq, record) in rows.enumerate() {
        let record = record?;
        stats.rows_read += 1;

        if cols.get(&record, "order_status") != Some(opts.status_filter.as_str()) {
            stats.rows_filtered += 1;
            continue;
        }
        let Some(side) = cols.get(&record, "order_side").and_then(Side::parse) else {
            stats.rows_filtered += 1;
            continue;
        };

        let account = cols.get_nonempty(&record, "user_id");
        let symbol = cols.get_nonempty(&record, symbol_col);
        let qty = cols
            .get(&record, "order_quantity")
            .and_then(|s| parse_qty(s).ok())
            .filter(|q| q.is_positive());
        let price = cols
            .get(&record, "order_avg_price")
            .and_then(|s| parse_micros(s).ok())
            .filter(|p| !p.is_negative());
        let timestamp = ts_cols
            .iter()
            .find_map(|c| cols.get(&record, c).and_then(parse_timestamp));

        match (account, symbol, qty, price, timestamp) {
            (Some(account), Some(symbol), Some(qty), Some(price), Some(ts)) => {
                executions.push(Execution::new(
                    account,
                    symbol,
                    side,
                    qty,
                    price,
                    ts,
                    seq as u64,
                ));
                stats.rows_ok += 1;
            }
            _ => {
                debug!(row = seq + 1, "order book row rejected");
                stats.rows_rejected += 1;
            }
        }
    }

    Ok(OrderBook { executions, stats })
}

#[cfg(test)]
mod tests {
    use super::*;
    use eod_ledger::{Micros, Qty};

    const HEADER: &str =
        "user_id,traiding_symbol,order_side,order_quantity,order_avg_price,order_status,order_generated_time,exchange_transact_time,_date";

    fn ts(y: i32, m: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, mi, s)
            .unwrap()
    }

    #[test]
    fn timestamps_are_day_first() {
        assert_eq!(parse_timestamp("03-04-2025 09:15:00"), Some(ts(2025, 4, 3, 9, 15, 0)));
        assert_eq!(parse_timestamp("03/04/2025 09:15"), Some(ts(2025, 4, 3, 9, 15, 0)));
        assert_eq!(parse_timestamp("2025-04-03 09:15:00.250").map(|t| t.date()), Some(ts(2025, 4, 3, 0, 0, 0).date()));
        assert_eq!(parse_timestamp("03-04-2025"), Some(ts(2025, 4, 3, 0, 0, 0)));
        assert_eq!(parse_timestamp("27 Mar 2025"), Some(ts(2025, 3, 27, 0, 0, 0)));
        assert_eq!(parse_timestamp("nonsense"), None);
        assert_eq!(parse_timestamp(""), None);
    }

    #[test]
    fn broker_timestamp_variants_parse() {
        let want = Some(ts(2025, 3, 27, 10, 0, 1));
        for raw in [
            "2025-03-27T10:00:01Z",
            "2025-03-27T10:00:01+05:30",
            "2025-03-27T10:00:01",
            "27-03-2025 10:00:01 AM",
            "27/03/2025 10:00:01 am",
            "27 Mar 2025 10:00:01",
            "27-Mar-2025 10:00:01",
        ] {
            assert_eq!(parse_timestamp(raw), want, "{raw}");
        }
        assert_eq!(parse_timestamp("27-03-2025 02:30:00 PM"), Some(ts(2025, 3, 27, 14, 30, 0)));
        assert_eq!(parse_timestamp("27/03/2025 12:05:00 AM"), Some(ts(2025, 3, 27, 0, 5, 0)));
    }

    #[test]
    fn offset_timestamps_are_not_rejected() {
        let csv = format!(
            "{HEADER}\n\
             A,X,BUY,1,10,COMPLETE,2025-03-27T10:00:01+05:30,,\n\
             A,X,SELL,1,11,COMPLETE,27-03-2025 10:05:00 AM,,\n"
        );
        let book = read_orderbook(csv.as_bytes(), &OrderBookOptions::default()).unwrap();
        assert_eq!(book.stats.rows_ok, 2);
        assert_eq!(book.stats.rows_rejected, 0);
        assert_eq!(book.executions[1].timestamp, ts(2025, 3, 27, 10, 5, 0));
    }

    #[test]
    fn timestamp_falls_back_across_columns() {
        let csv = format!(
            "{HEADER}\nA,NIFTY25MAR24500CE,buy,75,100.5,COMPLETE,,27-03-2025 10:00:01,\n"
        );
        let book = read_orderbook(csv.as_bytes(), &OrderBookOptions::default()).unwrap();
        assert_eq!(book.executions.len(), 1);
        let e = &book.executions[0];
        assert_eq!(e.side, Side::Buy);
        assert_eq!(e.timestamp, ts(2025, 3, 27, 10, 0, 1));
        assert_eq!(e.quantity, Qty::from_units(75));
        assert_eq!(e.price, Micros::new(100_500_000));
    }

    #[test]
    fn filters_and_rejects_are_counted() {
        let csv = format!(
            "{HEADER}\n\
             A,X,BUY,75,10,COMPLETE,27-03-2025 10:00:00,,\n\
             A,X,BUY,75,10,CANCELLED,27-03-2025 10:00:00,,\n\
             A,X,HOLD,75,10,COMPLETE,27-03-2025 10:00:00,,\n\
             A,X,SELL,0,10,COMPLETE,27-03-2025 10:00:00,,\n\
             A,X,SELL,75,abc,COMPLETE,27-03-2025 10:00:00,,\n\
             A,X,SELL,75,10,COMPLETE,,,\n"
        );
        let book = read_orderbook(csv.as_bytes(), &OrderBookOptions::default()).unwrap();
        assert_eq!(
            book.stats,
            IngestStats {
                rows_read: 6,
                rows_ok: 1,
                rows_rejected: 3,
                rows_filtered: 2,
            }
        );
    }

    #[test]
    fn seq_is_the_source_row_index() {
        let csv = format!(
            "{HEADER}\n\
             A,X,BUY,1,10,CANCELLED,27-03-2025 10:00:00,,\n\
             A,X,BUY,1,10,COMPLETE,27-03-2025 10:00:00,,\n"
        );
        let book = read_orderbook(csv.as_bytes(), &OrderBookOptions::default()).unwrap();
        assert_eq!(book.executions[0].seq, 1);
    }

    #[test]
    fn trading_symbol_spelling_is_accepted() {
        let csv = "user_id,trading_symbol,order_side,order_quantity,order_avg_price,order_status,_date\n\
                   A,X,SELL,1,1,COMPLETE,27-03-2025\n";
        let book = read_orderbook(csv.as_bytes(), &OrderBookOptions::default()).unwrap();
        assert_eq!(book.executions[0].instrument_key, "X");
    }

    #[test]
    fn missing_columns_are_all_named() {
        let csv = "user_id,order_side,order_quantity\n";
        let err = read_orderbook(csv.as_bytes(), &OrderBookOptions::default()).unwrap_err();
        match err {
            IngestError::MissingColumns(cols) => {
                assert!(cols.contains(&"order_status".to_string()));
                assert!(cols.contains(&"order_avg_price".to_string()));
                assert!(cols.iter().any(|c| c.contains("trading_symbol")));
                assert!(cols.iter().any(|c| c.contains("order_generated_time")));
            }
            other => panic!("expected MissingColumns, got {other:?}"),
        }
    }
}
