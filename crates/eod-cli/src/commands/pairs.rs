//! `eod pairs`: order book -> per-account FIFO pairs and pivot.

use anyhow::{Context, Result};
use eod_artifacts::fmt_money;
use eod_artifacts::records::PairTables;
use eod_ingest::OrderBookOptions;
use eod_ledger::{distinct_accounts, pair_reports_by_account, AccountPairOutcome};
use std::path::Path;
use tracing::{info, warn};

use super::{finish_report, print_table, ReportContext};

pub fn run(ctx: &ReportContext, orderbook: &Path, accounts: Vec<String>) -> Result<()> {
    let opts = OrderBookOptions {
        status_filter: ctx.cfg.orderbook.status_filter.clone(),
        timestamp_columns: ctx.cfg.orderbook.timestamp_columns.clone(),
    };
    let book = eod_ingest::read_orderbook_path(orderbook, &opts)
        .with_context(|| format!("read order book failed: {}", orderbook.display()))?;

    println!(
        "rows_read={} rows_ok={} rows_rejected={} rows_filtered={}",
        book.stats.rows_read, book.stats.rows_ok, book.stats.rows_rejected, book.stats.rows_filtered
    );

    // --account wins over orderbook.accounts; both empty = every account
    let accounts = if !accounts.is_empty() {
        accounts
    } else if !ctx.cfg.orderbook.accounts.is_empty() {
        ctx.cfg.orderbook.accounts.clone()
    } else {
        distinct_accounts(&book.executions)
    };

    let reports = pair_reports_by_account(&book.executions, &accounts);
    let sym = ctx.currency();

    for rep in &reports {
        println!();
        match &rep.outcome {
            AccountPairOutcome::NoExecutions => {
                warn!(account = %rep.account_id, "no executions for account");
                println!("account={} status=no_executions", rep.account_id);
            }
            AccountPairOutcome::NoCompletedTransitions { matches } => {
                println!(
                    "account={} status=no_completed_transitions open_instruments={}",
                    rep.account_id,
                    matches.open_positions().count()
                );
            }
            AccountPairOutcome::Completed { matches, pivot } => {
                println!(
                    "account={} status=completed pairs={} open_instruments={}",
                    rep.account_id,
                    matches.pair_count(),
                    matches.open_positions().count()
                );
                let rows: Vec<Vec<String>> = pivot
                    .rows_with_total()
                    .map(|r| {
                        vec![
                            r.instrument_key.clone(),
                            r.completed_transitions.to_string(),
                            fmt_money(r.total_buy_value, sym),
                            fmt_money(r.total_sell_value, sym),
                            fmt_money(r.total_realized_value, sym),
                        ]
                    })
                    .collect();
                print_table(
                    &["Instrument", "Transitions", "Buy Value", "Sell Value", "Realized"],
                    &rows,
                );
            }
        }
    }

    let Some(mut dir) = ctx.open_report(&[("orderbook", orderbook)])? else {
        return Ok(());
    };
    let tables = PairTables::from_reports(&reports);
    dir.write_csv("pairs.csv", &tables.pairs)?;
    dir.write_csv("pivot.csv", &tables.pivot)?;
    dir.write_csv("open_lots.csv", &tables.open_lots)?;
    info!(
        pairs = tables.pairs.len(),
        open_lots = tables.open_lots.len(),
        "pairs report written"
    );
    finish_report(dir)
}
