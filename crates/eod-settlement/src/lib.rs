//! eod-settlement
//!
//! Closed-form realized PNL and settlement-price valuation of broker position
//! rows, split by exchange segment (NFO/BFO), plus a per-account summary.
//!
//! Independent of the FIFO engine in `eod-ledger`: both compute realized PNL,
//! neither is derived from the other.

mod error;
mod types;

pub mod calculator;
pub mod summary;

pub use calculator::{
    compute_settlement, realized_pnl, settlement_pnl, SegmentTotals, SettlementResult,
    SettlementValuation, UnmatchedReference,
};
pub use error::SettlementError;
pub use summary::{build_account_summary, AccountFailure, AccountSummary, AccountSummaryRow};
pub use types::{
    check_required_columns, PositionRow, PositionTable, Segment, SegmentSettlement,
    SettlementConfig, SettlementPrices, ACCOUNT_COLUMN, REQUIRED_COLUMNS,
};
