//! eod-ledger
//!
//! FIFO trade matching and realized-PNL aggregation.
//! - Executions are matched per instrument, oldest resting lot first
//! - Partial fills split lots; residuals rest on the incoming side
//! - Realized pairs roll up into a per-instrument pivot with a grand total
//! - Pure deterministic logic (no IO, no clock, no shared state)

mod fixedpoint;
mod ordering;
mod types;

pub mod accounts;
pub mod matching;
pub mod pivot;

pub use accounts::{
    distinct_accounts, pair_report_for_account, pair_reports_by_account, AccountPairOutcome,
    AccountPairReport,
};
pub use fixedpoint::{value_of, value_of_saturating, Micros, Qty, MICROS_SCALE};
pub use matching::{match_executions, match_instrument, InstrumentBook, InstrumentMatch, MatchReport};
pub use ordering::{group_by_instrument, sort_executions_canonical};
pub use pivot::{aggregate_pairs, PivotReport, PivotRow, GRAND_TOTAL_KEY};
pub use types::{Direction, Execution, OpenLot, Side, TradePair};
