//! Shared fixtures for cross-crate end-to-end scenarios.
//!
//! - [`DayDir`]: a scratch directory holding one trading day's input files
//! - [`OrderBookCsv`]: builds broker order book CSV text row by row
//! - [`write_workbook`]: the same text as sheets of an `.xlsx` workbook
//! - [`positions_from_executions`] / [`positions_csv`]: the broker-style
//!   aggregate a positions export would carry for the same fills
//! - [`run_pairs_day`]: order book file -> FIFO reports -> report directory,
//!   in process

use anyhow::{Context, Result};
use eod_artifacts::records::PairTables;
use eod_artifacts::{init_report_dir, InitReportArgs};
use eod_ingest::{read_orderbook_path, IngestStats, OrderBookOptions};
use eod_ledger::{
    distinct_accounts, pair_reports_by_account, value_of_saturating, AccountPairReport, Execution,
    Micros, Qty, Side, MICROS_SCALE,
};
use eod_settlement::PositionRow;
use rust_xlsxwriter::Workbook;
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Scratch directory for one day's inputs; removed on drop.
pub struct DayDir {
    tmp: tempfile::TempDir,
}

impl DayDir {
    pub fn new() -> Result<Self> {
        Ok(Self {
            tmp: tempfile::tempdir().context("create temp day dir")?,
        })
    }

    pub fn path(&self) -> &Path {
        self.tmp.path()
    }

    pub fn exports(&self) -> PathBuf {
        self.tmp.path().join("exports")
    }

    pub fn write(&self, name: &str, body: &str) -> Result<PathBuf> {
        let p = self.tmp.path().join(name);
        fs::write(&p, body).with_context(|| format!("write fixture {}", p.display()))?;
        Ok(p)
    }

    /// `name` as a workbook; see [`write_workbook`].
    pub fn write_workbook(&self, name: &str, sheets: &[(&str, &str)]) -> Result<PathBuf> {
        let p = self.tmp.path().join(name);
        write_workbook(&p, sheets)?;
        Ok(p)
    }
}

/// Write an `.xlsx` whose sheets are given as comma-separated text.
///
/// Cells that parse as numbers become numeric cells, the way a broker's
/// Excel export stores quantities and prices; empty cells stay blank.
pub fn write_workbook(path: &Path, sheets: &[(&str, &str)]) -> Result<()> {
    let mut book = Workbook::new();
    for (name, body) in sheets {
        let ws = book.add_worksheet();
        ws.set_name(*name)?;
        for (r, line) in body.lines().enumerate() {
            let row = u32::try_from(r).context("too many rows")?;
            for (c, cell) in line.split(',').enumerate() {
                let col = u16::try_from(c).context("too many columns")?;
                if cell.is_empty() {
                    continue;
                }
                match cell.parse::<f64>() {
                    Ok(n) => ws.write_number(row, col, n)?,
                    Err(_) => ws.write_string(row, col, cell)?,
                };
            }
        }
    }
    book.save(path)
        .with_context(|| format!("write workbook {}", path.display()))?;
    Ok(())
}

const ORDERBOOK_HEADER: &str = "user_id,traiding_symbol,order_side,order_quantity,order_avg_price,order_status,order_generated_time";

/// Order book CSV text in the broker's column layout.
#[derive(Debug, Clone, Default)]
pub struct OrderBookCsv {
    rows: Vec<String>,
}

impl OrderBookCsv {
    pub fn new() -> Self {
        Self::default()
    }

    /// A `COMPLETE` row. `ts` is day-first, e.g. `27-03-2025 09:20:00`.
    pub fn fill(self, account: &str, symbol: &str, side: &str, qty: &str, price: &str, ts: &str) -> Self {
        self.row(account, symbol, side, qty, price, "COMPLETE", ts)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn row(
        mut self,
        account: &str,
        symbol: &str,
        side: &str,
        qty: &str,
        price: &str,
        status: &str,
        ts: &str,
    ) -> Self {
        self.rows.push(format!(
            "{account},{symbol},{side},{qty},{price},{status},{ts}"
        ));
        self
    }

    pub fn to_csv(&self) -> String {
        let mut out = String::from(ORDERBOOK_HEADER);
        out.push('\n');
        for r in &self.rows {
            out.push_str(r);
            out.push('\n');
        }
        out
    }
}

/// value * 1e6 / qty, half away from zero; zero for a zero quantity.
fn average_price(value: Micros, qty: Qty) -> Micros {
    if qty.is_zero() {
        return Micros::ZERO;
    }
    let num = value.raw() as i128 * MICROS_SCALE as i128;
    let den = qty.raw() as i128;
    let half = den.abs() / 2;
    let q = if (num >= 0) == (den > 0) {
        (num.abs() + half) / den.abs()
    } else {
        -((num.abs() + half) / den.abs())
    };
    Micros::new(i64::try_from(q).unwrap_or(if q > 0 { i64::MAX } else { i64::MIN }))
}

/// One position row per (account, symbol), first-appearance order, with the
/// volume-weighted averages a broker positions export carries.
pub fn positions_from_executions(exchange: &str, executions: &[Execution]) -> Vec<PositionRow> {
    struct Acc {
        account: String,
        symbol: String,
        buy_qty: Qty,
        sell_qty: Qty,
        buy_value: Micros,
        sell_value: Micros,
    }

    let mut accs: Vec<Acc> = Vec::new();
    for e in executions {
        let idx = match accs
            .iter()
            .position(|a| a.account == e.account_id && a.symbol == e.instrument_key)
        {
            Some(i) => i,
            None => {
                accs.push(Acc {
                    account: e.account_id.clone(),
                    symbol: e.instrument_key.clone(),
                    buy_qty: Qty::ZERO,
                    sell_qty: Qty::ZERO,
                    buy_value: Micros::ZERO,
                    sell_value: Micros::ZERO,
                });
                accs.len() - 1
            }
        };
        let a = &mut accs[idx];
        let v = value_of_saturating(e.price, e.quantity);
        match e.side {
            Side::Buy => {
                a.buy_qty += e.quantity;
                a.buy_value = a.buy_value.saturating_add(v);
            }
            Side::Sell => {
                a.sell_qty += e.quantity;
                a.sell_value = a.sell_value.saturating_add(v);
            }
        }
    }

    accs.into_iter()
        .map(|a| PositionRow {
            account_id: Some(a.account),
            exchange: exchange.to_string(),
            instrument_key: eod_ingest::instrument_key(exchange, &a.symbol),
            symbol: a.symbol,
            net_qty: a.buy_qty - a.sell_qty,
            buy_avg_price: average_price(a.buy_value, a.buy_qty),
            sell_avg_price: average_price(a.sell_value, a.sell_qty),
            buy_qty: a.buy_qty,
            sell_qty: a.sell_qty,
            realized_profit: Micros::ZERO,
            unrealized_profit: Micros::ZERO,
        })
        .collect()
}

/// Positions export CSV text for `rows`.
pub fn positions_csv(rows: &[PositionRow]) -> String {
    let mut out = String::from(
        "UserID,Exchange,Symbol,Net Qty,Buy Avg Price,Sell Avg Price,Sell Qty,Buy Qty,Realized Profit,Unrealized Profit\n",
    );
    for r in rows {
        out.push_str(&format!(
            "{},{},{},{},{},{},{},{},{},{}\n",
            r.account_id.as_deref().unwrap_or(""),
            r.exchange,
            r.symbol,
            r.net_qty,
            r.buy_avg_price,
            r.sell_avg_price,
            r.sell_qty,
            r.buy_qty,
            r.realized_profit,
            r.unrealized_profit
        ));
    }
    out
}

pub struct PairsDay {
    pub stats: IngestStats,
    pub executions: Vec<Execution>,
    pub reports: Vec<AccountPairReport>,
    pub report_id: Uuid,
    pub report_dir: PathBuf,
}

/// Order book file -> per-account FIFO reports -> `exports/<id>/`.
pub fn run_pairs_day(orderbook: &Path, exports_root: &Path, report_id: Uuid) -> Result<PairsDay> {
    let book = read_orderbook_path(orderbook, &OrderBookOptions::default())
        .with_context(|| format!("read order book {}", orderbook.display()))?;
    let accounts = distinct_accounts(&book.executions);
    let reports = pair_reports_by_account(&book.executions, &accounts);

    let mut dir = init_report_dir(InitReportArgs {
        exports_root,
        report_id,
        kind: "PAIRS",
        config_hash: "TEST",
        inputs: &[("orderbook", orderbook)],
    })?;
    let tables = PairTables::from_reports(&reports);
    dir.write_csv("pairs.csv", &tables.pairs)?;
    dir.write_csv("pivot.csv", &tables.pivot)?;
    dir.write_csv("open_lots.csv", &tables.open_lots)?;
    let report_dir = dir.path().to_path_buf();
    dir.finish()?;

    Ok(PairsDay {
        stats: book.stats,
        executions: book.executions,
        reports,
        report_id,
        report_dir,
    })
}
