//! `eod exits`: why each option portfolio was closed.

use anyhow::{Context, Result};
use eod_artifacts::records::ExitReasonRecord;
use eod_ingest::{compute_exit_reasons, exit_report_file_name, LegEntry};
use std::path::{Path, PathBuf};

use super::{finish_report, print_table, ReportContext};

pub fn run(
    ctx: &ReportContext,
    gridlog: &Path,
    legs: &[PathBuf],
    summary: Option<&Path>,
) -> Result<()> {
    let grid = eod_ingest::read_grid_log_path(gridlog)
        .with_context(|| format!("read grid log failed: {}", gridlog.display()))?;

    let mut leg_files: Vec<Vec<LegEntry>> = Vec::with_capacity(legs.len());
    for p in legs {
        let entries = eod_ingest::read_legs_path(p)
            .with_context(|| format!("read legs failed: {}", p.display()))?;
        leg_files.push(entries);
    }
    if let Some(p) = summary {
        let sheets = eod_ingest::read_summary_legs_path(p)
            .with_context(|| format!("read summary workbook failed: {}", p.display()))?;
        println!("summary_legs_sheets={}", sheets.len());
        leg_files.extend(sheets);
    }

    let reasons = compute_exit_reasons(&grid, &leg_files).context("exit reasons failed")?;
    let records: Vec<ExitReasonRecord> = reasons.iter().map(Into::into).collect();

    let rows: Vec<Vec<String>> = records
        .iter()
        .map(|r| vec![r.portfolio.clone(), r.reason.clone(), r.time.clone()])
        .collect();
    print_table(&["Option Portfolio", "Reason", "Time"], &rows);
    println!("portfolios={}", records.len());

    let grid_name = gridlog
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let out_name = exit_report_file_name(&grid_name)?;

    let mut inputs: Vec<(String, &Path)> = vec![("gridlog".to_string(), gridlog)];
    for (i, p) in legs.iter().enumerate() {
        inputs.push((format!("legs_{}", i + 1), p.as_path()));
    }
    if let Some(p) = summary {
        inputs.push(("summary".to_string(), p));
    }
    let inputs: Vec<(&str, &Path)> = inputs.iter().map(|(r, p)| (r.as_str(), *p)).collect();

    let Some(mut dir) = ctx.open_report(&inputs)? else {
        return Ok(());
    };
    dir.write_csv(&out_name, &records)?;
    println!("exit_report={}", out_name);
    finish_report(dir)
}
