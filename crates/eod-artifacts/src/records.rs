//! Flat CSV / JSON record shapes for report files.
//!
//! Fixed-point values are rendered with their 6-decimal `Display`; nothing is
//! rounded on the way out.

use eod_ingest::ExitReason;
use eod_ledger::{AccountPairOutcome, AccountPairReport, Micros, PivotRow, TradePair};
use eod_settlement::{
    AccountFailure, AccountSummary, AccountSummaryRow, SettlementResult, SettlementValuation,
};
use serde::{Deserialize, Serialize};

/// A serializable row with a fixed header.
pub trait CsvRecord: Serialize {
    const HEADER: &'static [&'static str];
}

const TS_FMT: &str = "%Y-%m-%d %H:%M:%S%.f";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairRecord {
    pub account_id: String,
    pub instrument_key: String,
    pub direction: String,
    pub buy_time: String,
    pub buy_quantity: String,
    pub buy_avg_price: String,
    pub buy_value: String,
    pub sell_time: String,
    pub sell_quantity: String,
    pub sell_avg_price: String,
    pub sell_value: String,
    pub realized_value: String,
}

impl CsvRecord for PairRecord {
    const HEADER: &'static [&'static str] = &[
        "account_id",
        "instrument_key",
        "direction",
        "buy_time",
        "buy_quantity",
        "buy_avg_price",
        "buy_value",
        "sell_time",
        "sell_quantity",
        "sell_avg_price",
        "sell_value",
        "realized_value",
    ];
}

impl PairRecord {
    pub fn new(account_id: &str, p: &TradePair) -> Self {
        Self {
            account_id: account_id.to_string(),
            instrument_key: p.instrument_key.clone(),
            direction: p.direction.as_str().to_string(),
            buy_time: p.buy_time.format(TS_FMT).to_string(),
            buy_quantity: p.buy_quantity.to_string(),
            buy_avg_price: p.buy_avg_price.to_string(),
            buy_value: p.buy_value.to_string(),
            sell_time: p.sell_time.format(TS_FMT).to_string(),
            sell_quantity: p.sell_quantity.to_string(),
            sell_avg_price: p.sell_avg_price.to_string(),
            sell_value: p.sell_value.to_string(),
            realized_value: p.realized_value.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PivotRecord {
    pub account_id: String,
    pub instrument_key: String,
    pub completed_transitions: u64,
    pub total_buy_value: String,
    pub total_sell_value: String,
    pub total_realized_value: String,
    pub is_total: bool,
}

impl CsvRecord for PivotRecord {
    const HEADER: &'static [&'static str] = &[
        "account_id",
        "instrument_key",
        "completed_transitions",
        "total_buy_value",
        "total_sell_value",
        "total_realized_value",
        "is_total",
    ];
}

impl PivotRecord {
    pub fn new(account_id: &str, r: &PivotRow) -> Self {
        Self {
            account_id: account_id.to_string(),
            instrument_key: r.instrument_key.clone(),
            completed_transitions: r.completed_transitions,
            total_buy_value: r.total_buy_value.to_string(),
            total_sell_value: r.total_sell_value.to_string(),
            total_realized_value: r.total_realized_value.to_string(),
            is_total: r.is_total,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenLotRecord {
    pub account_id: String,
    pub instrument_key: String,
    pub side: String,
    pub remaining_quantity: String,
    pub price: String,
    pub timestamp: String,
}

impl CsvRecord for OpenLotRecord {
    const HEADER: &'static [&'static str] = &[
        "account_id",
        "instrument_key",
        "side",
        "remaining_quantity",
        "price",
        "timestamp",
    ];
}

/// pairs.csv / pivot.csv / open_lots.csv contents for a batch of accounts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PairTables {
    pub pairs: Vec<PairRecord>,
    pub pivot: Vec<PivotRecord>,
    pub open_lots: Vec<OpenLotRecord>,
}

impl PairTables {
    pub fn from_reports(reports: &[AccountPairReport]) -> Self {
        let mut out = PairTables::default();
        for rep in reports {
            let acc = rep.account_id.as_str();
            let matches = match &rep.outcome {
                AccountPairOutcome::NoExecutions => continue,
                AccountPairOutcome::NoCompletedTransitions { matches } => matches,
                AccountPairOutcome::Completed { matches, pivot } => {
                    out.pivot
                        .extend(pivot.rows_with_total().map(|r| PivotRecord::new(acc, r)));
                    matches
                }
            };
            out.pairs
                .extend(matches.pairs().map(|p| PairRecord::new(acc, p)));
            for m in matches.open_positions() {
                let Some(side) = m.open_side else { continue };
                for lot in &m.open_lots {
                    out.open_lots.push(OpenLotRecord {
                        account_id: acc.to_string(),
                        instrument_key: m.instrument_key.clone(),
                        side: side.as_str().to_string(),
                        remaining_quantity: lot.remaining_quantity.to_string(),
                        price: lot.price.to_string(),
                        timestamp: lot.timestamp.format(TS_FMT).to_string(),
                    });
                }
            }
        }
        out
    }
}

fn opt_account(a: &Option<String>) -> String {
    a.clone().unwrap_or_default()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValuationRecord {
    pub account_id: String,
    pub segment: String,
    pub symbol: String,
    pub instrument_key: String,
    pub net_quantity: String,
    /// Empty when no settlement price applied.
    pub settlement_price: String,
    pub calculated_realized_pnl: String,
    pub calculated_settlement_pnl: String,
}

impl CsvRecord for ValuationRecord {
    const HEADER: &'static [&'static str] = &[
        "account_id",
        "segment",
        "symbol",
        "instrument_key",
        "net_quantity",
        "settlement_price",
        "calculated_realized_pnl",
        "calculated_settlement_pnl",
    ];
}

impl From<&SettlementValuation> for ValuationRecord {
    fn from(v: &SettlementValuation) -> Self {
        Self {
            account_id: opt_account(&v.account_id),
            segment: v.segment.as_str().to_string(),
            symbol: v.symbol.clone(),
            instrument_key: v.instrument_key.clone(),
            net_quantity: v.net_quantity.to_string(),
            settlement_price: v
                .settlement_price
                .map(|p| p.to_string())
                .unwrap_or_default(),
            calculated_realized_pnl: v.calculated_realized_pnl.to_string(),
            calculated_settlement_pnl: v.calculated_settlement_pnl.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentTotalsJson {
    pub rows: usize,
    pub realized: String,
    pub settlement: String,
    pub total: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnmatchedJson {
    pub account_id: Option<String>,
    pub segment: String,
    pub instrument_key: String,
}

/// settlement.json
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementJson {
    pub account_id: Option<String>,
    pub nfo: SegmentTotalsJson,
    pub bfo: SegmentTotalsJson,
    pub overall_realized: String,
    pub overall_settlement: String,
    pub grand_total: String,
    pub unmatched: Vec<UnmatchedJson>,
}

impl SettlementJson {
    pub fn new(account_id: Option<&str>, r: &SettlementResult) -> Self {
        let seg = |t: &eod_settlement::SegmentTotals| SegmentTotalsJson {
            rows: t.rows,
            realized: t.realized.to_string(),
            settlement: t.settlement.to_string(),
            total: t.total().to_string(),
        };
        Self {
            account_id: account_id.map(str::to_string),
            nfo: seg(&r.nfo),
            bfo: seg(&r.bfo),
            overall_realized: r.overall_realized.to_string(),
            overall_settlement: r.overall_settlement.to_string(),
            grand_total: r.grand_total.to_string(),
            unmatched: r
                .unmatched
                .iter()
                .map(|u| UnmatchedJson {
                    account_id: u.account_id.clone(),
                    segment: u.segment.as_str().to_string(),
                    instrument_key: u.instrument_key.clone(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryRecord {
    #[serde(rename = "UserID")]
    pub account_id: String,
    #[serde(rename = "NFO Realized")]
    pub nfo_realized: String,
    #[serde(rename = "NFO Settlement")]
    pub nfo_settlement: String,
    #[serde(rename = "BFO Realized")]
    pub bfo_realized: String,
    #[serde(rename = "BFO Settlement")]
    pub bfo_settlement: String,
    #[serde(rename = "Total Realized")]
    pub total_realized: String,
    #[serde(rename = "Total Settlement")]
    pub total_settlement: String,
    #[serde(rename = "Grand Total")]
    pub grand_total: String,
}

impl CsvRecord for SummaryRecord {
    const HEADER: &'static [&'static str] = &[
        "UserID",
        "NFO Realized",
        "NFO Settlement",
        "BFO Realized",
        "BFO Settlement",
        "Total Realized",
        "Total Settlement",
        "Grand Total",
    ];
}

impl From<&AccountSummaryRow> for SummaryRecord {
    fn from(r: &AccountSummaryRow) -> Self {
        let m = |v: Micros| v.to_string();
        Self {
            account_id: r.account_id.clone(),
            nfo_realized: m(r.nfo_realized),
            nfo_settlement: m(r.nfo_settlement),
            bfo_realized: m(r.bfo_realized),
            bfo_settlement: m(r.bfo_settlement),
            total_realized: m(r.total_realized),
            total_settlement: m(r.total_settlement),
            grand_total: m(r.grand_total),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureRecord {
    pub account_id: String,
    /// `failed` or `no_data`
    pub status: String,
    pub error: String,
}

impl CsvRecord for FailureRecord {
    const HEADER: &'static [&'static str] = &["account_id", "status", "error"];
}

impl From<&AccountFailure> for FailureRecord {
    fn from(f: &AccountFailure) -> Self {
        Self {
            account_id: f.account_id.clone(),
            status: "failed".to_string(),
            error: f.error.to_string(),
        }
    }
}

/// summary.csv and failures.csv rows.
pub fn summary_tables(s: &AccountSummary) -> (Vec<SummaryRecord>, Vec<FailureRecord>) {
    let rows = s.rows.iter().map(SummaryRecord::from).collect();
    let mut failures: Vec<FailureRecord> = s.failures.iter().map(FailureRecord::from).collect();
    failures.extend(s.empty_accounts.iter().map(|a| FailureRecord {
        account_id: a.clone(),
        status: "no_data".to_string(),
        error: String::new(),
    }));
    (rows, failures)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExitReasonRecord {
    #[serde(rename = "Option Portfolio")]
    pub portfolio: String,
    #[serde(rename = "Reason")]
    pub reason: String,
    #[serde(rename = "Time")]
    pub time: String,
}

impl CsvRecord for ExitReasonRecord {
    const HEADER: &'static [&'static str] = &["Option Portfolio", "Reason", "Time"];
}

impl From<&ExitReason> for ExitReasonRecord {
    fn from(e: &ExitReason) -> Self {
        Self {
            portfolio: e.portfolio.clone(),
            reason: e.reason.clone(),
            time: e.time.clone().unwrap_or_default(),
        }
    }
}
