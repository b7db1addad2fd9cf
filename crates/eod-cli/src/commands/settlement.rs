//! `eod settlement` and `eod summary`: positions export valued against
//! bhavcopy settlement prices.

use anyhow::{bail, Context, Result};
use chrono::{Local, NaiveDate};
use eod_artifacts::fmt_money;
use eod_artifacts::records::{summary_tables, SettlementJson, ValuationRecord};
use eod_config::EodConfig;
use eod_ingest::NfoFilter;
use eod_settlement::{
    build_account_summary, compute_settlement, Segment, SegmentSettlement, SettlementConfig,
    SettlementResult,
};
use std::path::{Path, PathBuf};
use tracing::info;

use super::{finish_report, print_table, ReportContext};
use crate::SegmentArgs;

/// Resolved settlement inputs for one segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SegmentPlan {
    Disabled,
    Enabled { bhav: PathBuf, expiry: NaiveDate },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettlementPlan {
    pub nfo: SegmentPlan,
    pub nfo_underlying: String,
    pub bfo: SegmentPlan,
}

/// Combine flags with config. Flags win; expiry falls back to `today`.
///
/// An enabled segment with no bhavcopy path is an error, raised before any
/// file is read.
pub fn plan_settlement(
    args: &SegmentArgs,
    cfg: &EodConfig,
    today: NaiveDate,
) -> Result<SettlementPlan> {
    let nfo_on = cfg.settlement.nfo.enabled && !args.no_nfo;
    let bfo_on = cfg.settlement.bfo.enabled && !args.no_bfo;

    let nfo = if nfo_on {
        let Some(bhav) = args.nfo_bhav.clone() else {
            bail!("NFO settlement is enabled but no --nfo-bhav file was given (pass --no-nfo to skip)");
        };
        SegmentPlan::Enabled {
            bhav,
            expiry: args
                .nfo_expiry
                .or(cfg.settlement.nfo.expiry)
                .unwrap_or(today),
        }
    } else {
        SegmentPlan::Disabled
    };

    let bfo = if bfo_on {
        let Some(bhav) = args.bfo_bhav.clone() else {
            bail!("BFO settlement is enabled but no --bfo-bhav file was given (pass --no-bfo to skip)");
        };
        SegmentPlan::Enabled {
            bhav,
            expiry: args
                .bfo_expiry
                .or(cfg.settlement.bfo.expiry)
                .unwrap_or(today),
        }
    } else {
        SegmentPlan::Disabled
    };

    Ok(SettlementPlan {
        nfo,
        nfo_underlying: cfg.settlement.nfo.underlying.clone(),
        bfo,
    })
}

impl SettlementPlan {
    /// Bhavcopy files, for the manifest digest list.
    pub fn inputs(&self) -> Vec<(&'static str, &Path)> {
        let mut out = Vec::new();
        if let SegmentPlan::Enabled { bhav, .. } = &self.nfo {
            out.push(("nfo_bhav", bhav.as_path()));
        }
        if let SegmentPlan::Enabled { bhav, .. } = &self.bfo {
            out.push(("bfo_bhav", bhav.as_path()));
        }
        out
    }

    /// Read the bhavcopies the plan enables.
    pub fn load(&self) -> Result<SettlementConfig> {
        let nfo = match &self.nfo {
            SegmentPlan::Disabled => SegmentSettlement::disabled(),
            SegmentPlan::Enabled { bhav, expiry } => {
                let filter = NfoFilter {
                    expiry: *expiry,
                    underlying: self.nfo_underlying.clone(),
                };
                let load = eod_ingest::read_nfo_bhavcopy_path(bhav, &filter)
                    .with_context(|| format!("read NFO bhavcopy failed: {}", bhav.display()))?;
                println!("nfo_expiry={} nfo_prices={}", expiry, load.prices.len());
                SegmentSettlement::enabled(load.prices)
            }
        };
        let bfo = match &self.bfo {
            SegmentPlan::Disabled => SegmentSettlement::disabled(),
            SegmentPlan::Enabled { bhav, expiry } => {
                let load = eod_ingest::read_bfo_bhavcopy_path(bhav, *expiry)
                    .with_context(|| format!("read BFO bhavcopy failed: {}", bhav.display()))?;
                println!("bfo_expiry={} bfo_prices={}", expiry, load.prices.len());
                SegmentSettlement::enabled(load.prices)
            }
        };
        Ok(SettlementConfig { nfo, bfo })
    }
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

pub fn run_settlement(
    ctx: &ReportContext,
    positions: &Path,
    account: Option<&str>,
    segments: &SegmentArgs,
) -> Result<()> {
    let plan = plan_settlement(segments, &ctx.cfg, today())?;

    let table = eod_ingest::read_positions_path(positions)
        .with_context(|| format!("read positions failed: {}", positions.display()))?;
    if account.is_some() && !table.has_account_column() {
        bail!("--account needs a UserID column in {}", positions.display());
    }
    let settle_cfg = plan.load()?;

    let result = match account {
        Some(a) => compute_settlement(table.rows_for_account(a), &settle_cfg),
        None => compute_settlement(table.rows(), &settle_cfg),
    }
    .context("settlement calculation failed")?;

    let Some(result) = result else {
        println!("status=no_data rows=0");
        return Ok(());
    };

    print_settlement(&result, ctx.currency());

    let mut inputs: Vec<(&str, &Path)> = vec![("positions", positions)];
    inputs.extend(plan.inputs());
    let Some(mut dir) = ctx.open_report(&inputs)? else {
        return Ok(());
    };
    dir.write_json("settlement.json", &SettlementJson::new(account, &result))?;
    let valuations: Vec<ValuationRecord> = result.valuations.iter().map(Into::into).collect();
    dir.write_csv("valuations.csv", &valuations)?;
    finish_report(dir)
}

fn print_settlement(r: &SettlementResult, sym: &str) {
    let rows: Vec<Vec<String>> = Segment::ALL
        .iter()
        .map(|s| {
            let t = r.segment(*s);
            vec![
                s.as_str().to_string(),
                t.rows.to_string(),
                fmt_money(t.realized, sym),
                fmt_money(t.settlement, sym),
                fmt_money(t.total(), sym),
            ]
        })
        .chain(std::iter::once(vec![
            "Overall".to_string(),
            (r.nfo.rows + r.bfo.rows).to_string(),
            fmt_money(r.overall_realized, sym),
            fmt_money(r.overall_settlement, sym),
            fmt_money(r.grand_total, sym),
        ]))
        .collect();
    print_table(&["Segment", "Rows", "Realized", "Settlement", "Total"], &rows);

    for u in &r.unmatched {
        println!(
            "unmatched segment={} instrument={} account={}",
            u.segment,
            u.instrument_key,
            u.account_id.as_deref().unwrap_or("-")
        );
    }
}

pub fn run_summary(
    ctx: &ReportContext,
    positions: &Path,
    accounts: Vec<String>,
    segments: &SegmentArgs,
) -> Result<()> {
    let plan = plan_settlement(segments, &ctx.cfg, today())?;

    let table = eod_ingest::read_positions_path(positions)
        .with_context(|| format!("read positions failed: {}", positions.display()))?;
    let settle_cfg = plan.load()?;

    // --account wins over summary.accounts; both empty = every account
    let accounts = if accounts.is_empty() {
        ctx.cfg.summary.accounts.clone()
    } else {
        accounts
    };

    let summary = build_account_summary(&table, &accounts, &settle_cfg)
        .context("account summary failed")?;

    let sym = ctx.currency();
    let rows: Vec<Vec<String>> = summary
        .rows
        .iter()
        .map(|r| {
            vec![
                r.account_id.clone(),
                fmt_money(r.nfo_realized, sym),
                fmt_money(r.nfo_settlement, sym),
                fmt_money(r.bfo_realized, sym),
                fmt_money(r.bfo_settlement, sym),
                fmt_money(r.total_realized, sym),
                fmt_money(r.total_settlement, sym),
                fmt_money(r.grand_total, sym),
            ]
        })
        .collect();
    print_table(
        &[
            "UserID",
            "NFO Realized",
            "NFO Settlement",
            "BFO Realized",
            "BFO Settlement",
            "Total Realized",
            "Total Settlement",
            "Grand Total",
        ],
        &rows,
    );
    for f in &summary.failures {
        println!("failed account={} error={}", f.account_id, f.error);
    }
    for a in &summary.empty_accounts {
        println!("no_data account={}", a);
    }
    println!(
        "accounts_ok={} accounts_failed={} accounts_empty={}",
        summary.rows.len(),
        summary.failures.len(),
        summary.empty_accounts.len()
    );

    let mut inputs: Vec<(&str, &Path)> = vec![("positions", positions)];
    inputs.extend(plan.inputs());
    let Some(mut dir) = ctx.open_report(&inputs)? else {
        return Ok(());
    };
    let (rows, failures) = summary_tables(&summary);
    dir.write_csv("summary.csv", &rows)?;
    dir.write_csv("failures.csv", &failures)?;
    info!(accounts = rows.len(), "summary report written");
    finish_report(dir)
}
