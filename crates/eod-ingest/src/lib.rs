//! eod-ingest
//!
//! Readers for the end-of-day inputs. Order book, grid log and leg exports
//! may be CSV or Excel workbooks; the rest are CSV:
//! - broker order book -> executions (with row accounting)
//! - broker positions -> validated position table
//! - NFO / BFO bhavcopy -> settlement price maps for one expiry
//! - strategy grid log + leg exports -> portfolio exit reasons
//!
//! Header problems are errors. Bad order book and bhavcopy rows are counted
//! and skipped; bad position rows are errors.

mod error;
mod table;
mod workbook;

pub mod bhavcopy;
pub mod decimal;
pub mod exits;
pub mod orderbook;
pub mod positions;

pub use bhavcopy::{
    read_bfo_bhavcopy, read_bfo_bhavcopy_path, read_nfo_bhavcopy, read_nfo_bhavcopy_path,
    BhavLoad, BhavStats, NfoFilter, DEFAULT_NFO_UNDERLYING,
};
pub use decimal::{parse_micros, parse_qty, DecimalError};
pub use error::IngestError;
pub use exits::{
    compute_exit_reasons, exit_report_file_name, read_grid_log, read_grid_log_path, read_legs,
    read_legs_path, read_summary_legs_path, ExitReason, GridEntry, LegEntry,
};
pub use orderbook::{
    parse_timestamp, read_orderbook, read_orderbook_path, IngestStats, OrderBook,
    OrderBookOptions,
};
pub use positions::{instrument_key, read_positions, read_positions_path};
pub use workbook::is_workbook;
