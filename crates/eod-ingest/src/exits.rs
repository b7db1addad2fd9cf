//! Portfolio exit reasons from a strategy grid log and leg exports (CSV
//! files or the `legs` sheets of a summary workbook).
//!
//! A portfolio's reason comes from (in merge order):
//! 1. combined SL / trail-target messages seen at least twice in the grid log
//! 2. legs closed by `OnSqOffTime`
//! 3. otherwise, when every leg is `completed`, the exit type of the first leg
//!    whose exit time shows up in that portfolio's grid timestamps
//!
//! Times stay as the source strings; "latest" is a string maximum.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::io::Read;
use std::path::Path;

use csv::StringRecord;
use regex::Regex;
use tracing::{debug, info, warn};

use crate::error::IngestError;
use crate::table::{csv_reader, open, ColumnIndex};
use crate::workbook::{first_sheet, is_workbook, sheets_named_like};

const SQ_OFF: &str = "OnSqOffTime";
const ALL_LEGS_COMPLETED: &str = "AllLegsCompleted";
const LEGS_SHEET_MARKER: &str = "legs";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridEntry {
    pub message: String,
    pub portfolio: Option<String>,
    pub timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegEntry {
    pub portfolio: String,
    pub exit_type: Option<String>,
    pub exit_time: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExitReason {
    pub portfolio: String,
    pub reason: String,
    pub time: Option<String>,
}

/// Grid log from CSV or, for `.xlsx` / `.xls`, the first worksheet.
pub fn read_grid_log_path(path: &Path) -> Result<Vec<GridEntry>, IngestError> {
    let entries = if is_workbook(path) {
        let sheet = first_sheet(path)?;
        grid_from_rows(&ColumnIndex::from_headers(&sheet.headers), sheet.rows.into_iter().map(Ok))?
    } else {
        read_grid_log(open(path)?)?
    };
    info!(path = %path.display(), rows = entries.len(), "grid log loaded");
    Ok(entries)
}

pub fn read_grid_log<R: Read>(src: R) -> Result<Vec<GridEntry>, IngestError> {
    let mut rdr = csv_reader(src);
    let cols = ColumnIndex::from_headers(rdr.headers()?);
    grid_from_rows(&cols, rdr.into_records().map(|r| r.map_err(IngestError::from)))
}

fn grid_from_rows<I>(cols: &ColumnIndex, rows: I) -> Result<Vec<GridEntry>, IngestError>
where
    I: Iterator<Item = Result<StringRecord, IngestError>>,
{
    cols.require(&["Message", "Option Portfolio", "Timestamp"])?;

    let mut out = Vec::new();
    for record in rows {
        let record = record?;
        out.push(GridEntry {
            message: cols.get(&record, "Message").unwrap_or("").to_string(),
            portfolio: cols
                .get_nonempty(&record, "Option Portfolio")
                .map(str::to_string),
            timestamp: cols.get(&record, "Timestamp").unwrap_or("").to_string(),
        });
    }
    Ok(out)
}

/// One leg export, CSV or the first worksheet of a workbook.
pub fn read_legs_path(path: &Path) -> Result<Vec<LegEntry>, IngestError> {
    let legs = if is_workbook(path) {
        let sheet = first_sheet(path)?;
        legs_from_rows(&ColumnIndex::from_headers(&sheet.headers), sheet.rows.into_iter().map(Ok))?
    } else {
        read_legs(open(path)?)?
    };
    info!(path = %path.display(), rows = legs.len(), "legs loaded");
    Ok(legs)
}

/// Only `Portfolio Name` is mandatory; rows without one are dropped.
pub fn read_legs<R: Read>(src: R) -> Result<Vec<LegEntry>, IngestError> {
    let mut rdr = csv_reader(src);
    let cols = ColumnIndex::from_headers(rdr.headers()?);
    legs_from_rows(&cols, rdr.into_records().map(|r| r.map_err(IngestError::from)))
}

/// Every worksheet of a strategy summary workbook whose name contains
/// `legs` (any case), one leg list per sheet in workbook order.
///
/// Sheets without a `Portfolio Name` column are skipped with a warning.
pub fn read_summary_legs_path(path: &Path) -> Result<Vec<Vec<LegEntry>>, IngestError> {
    let mut out = Vec::new();
    for sheet in sheets_named_like(path, LEGS_SHEET_MARKER)? {
        let cols = ColumnIndex::from_headers(&sheet.headers);
        match legs_from_rows(&cols, sheet.rows.into_iter().map(Ok)) {
            Ok(legs) => {
                debug!(sheet = %sheet.name, rows = legs.len(), "legs sheet loaded");
                out.push(legs);
            }
            Err(IngestError::MissingColumns(missing)) => {
                warn!(sheet = %sheet.name, missing = %missing.join(", "), "legs sheet skipped");
            }
            Err(e) => return Err(e),
        }
    }
    if out.is_empty() {
        warn!(path = %path.display(), "summary workbook has no usable legs sheets");
    }
    info!(path = %path.display(), sheets = out.len(), "summary legs loaded");
    Ok(out)
}

fn legs_from_rows<I>(cols: &ColumnIndex, rows: I) -> Result<Vec<LegEntry>, IngestError>
where
    I: Iterator<Item = Result<StringRecord, IngestError>>,
{
    cols.require(&["Portfolio Name"])?;

    let mut out = Vec::new();
    for record in rows {
        let record = record?;
        let Some(portfolio) = cols.get_nonempty(&record, "Portfolio Name") else {
            continue;
        };
        let opt = |name: &str| cols.get_nonempty(&record, name).map(str::to_string);
        out.push(LegEntry {
            portfolio: portfolio.to_string(),
            exit_type: opt("Exit Type"),
            exit_time: opt("Exit Time"),
            status: opt("Status"),
        });
    }
    Ok(out)
}

struct Patterns {
    trigger: Regex,
    kind: Regex,
    hit: Regex,
}

impl Patterns {
    fn new() -> Result<Self, IngestError> {
        Ok(Self {
            trigger: Regex::new(r"(?i)Combined SL:|Combined trail target:")?,
            kind: Regex::new(r"(?i)(Combined SL|Combined trail target)")?,
            hit: Regex::new(r"(?i)(Combined SL: [^ ]+ hit|Combined Trail Target: [^ ]+ hit)")?,
        })
    }

    /// Keep a single `... hit` phrase when present; otherwise drop the
    /// `AllLegsCompleted` marker.
    fn clean(&self, reason: &str) -> String {
        if let Some(m) = self.hit.find(reason) {
            return m.as_str().to_string();
        }
        reason
            .replace(&format!("{ALL_LEGS_COMPLETED},"), "")
            .replace(ALL_LEGS_COMPLETED, "")
            .trim()
            .to_string()
    }
}

/// Grid-log triggers, grouped per portfolio.
fn grid_reasons(p: &Patterns, grid: &[GridEntry]) -> BTreeMap<String, (Vec<String>, String)> {
    let hits: Vec<(&str, &str, &GridEntry)> = grid
        .iter()
        .filter(|g| p.trigger.is_match(&g.message))
        .filter_map(|g| {
            let portfolio = g.portfolio.as_deref()?;
            let kind = p.kind.find(&g.message)?.as_str();
            Some((portfolio, kind, g))
        })
        .collect();

    let mut seen: HashMap<(&str, &str), usize> = HashMap::new();
    for (portfolio, kind, _) in &hits {
        *seen.entry((*portfolio, *kind)).or_default() += 1;
    }

    let mut out: BTreeMap<String, (Vec<String>, String)> = BTreeMap::new();
    for (portfolio, kind, g) in hits {
        if seen.get(&(portfolio, kind)).copied().unwrap_or(0) < 2 {
            continue;
        }
        let slot = out.entry(portfolio.to_string()).or_default();
        if !slot.0.contains(&g.message) {
            slot.0.push(g.message.clone());
        }
        if g.timestamp > slot.1 {
            slot.1 = g.timestamp.clone();
        }
    }
    out
}

/// Latest `OnSqOffTime` exit per portfolio, one map per leg file.
fn sq_off_reasons(legs: &[LegEntry]) -> BTreeMap<String, Option<String>> {
    let mut out: BTreeMap<String, Option<String>> = BTreeMap::new();
    for leg in legs
        .iter()
        .filter(|l| l.exit_type.as_deref().map(str::trim) == Some(SQ_OFF))
    {
        let slot = out.entry(leg.portfolio.clone()).or_default();
        if leg.exit_time > *slot {
            *slot = leg.exit_time.clone();
        }
    }
    out
}

/// Build the exit-reason table.
///
/// Rows from the grid / square-off merge come first, sorted by portfolio;
/// all-legs-completed portfolios follow in leg-file order.
pub fn compute_exit_reasons(
    grid: &[GridEntry],
    leg_files: &[Vec<LegEntry>],
) -> Result<Vec<ExitReason>, IngestError> {
    let p = Patterns::new()?;

    // portfolio -> (reasons, times in merge order)
    let mut merged: BTreeMap<String, (BTreeSet<String>, Vec<Option<String>>)> = BTreeMap::new();
    for (portfolio, (messages, time)) in grid_reasons(&p, grid) {
        let slot = merged.entry(portfolio).or_default();
        slot.0.insert(messages.join(", "));
        slot.1.push(Some(time).filter(|t| !t.is_empty()));
    }
    for legs in leg_files {
        for (portfolio, time) in sq_off_reasons(legs) {
            let slot = merged.entry(portfolio).or_default();
            slot.0.insert(SQ_OFF.to_string());
            slot.1.push(time);
        }
    }

    let mut out: Vec<ExitReason> = merged
        .into_iter()
        .map(|(portfolio, (reasons, times))| ExitReason {
            portfolio,
            reason: reasons.into_iter().collect::<Vec<_>>().join(", "),
            time: times.into_iter().flatten().last(),
        })
        .collect();

    let grid_portfolios: BTreeSet<&str> = grid.iter().filter_map(|g| g.portfolio.as_deref()).collect();
    let mut resolved: BTreeSet<String> = out.iter().map(|r| r.portfolio.clone()).collect();

    for legs in leg_files {
        let mut by_portfolio: BTreeMap<&str, Vec<&LegEntry>> = BTreeMap::new();
        for leg in legs {
            by_portfolio.entry(leg.portfolio.as_str()).or_default().push(leg);
        }

        for (portfolio, group) in by_portfolio {
            if resolved.contains(portfolio) || !grid_portfolios.contains(portfolio) {
                continue;
            }
            let statuses: BTreeSet<&str> = group
                .iter()
                .map(|l| l.status.as_deref().map(str::trim).unwrap_or(""))
                .collect();
            let all_completed = statuses.len() == 1
                && statuses
                    .iter()
                    .next()
                    .is_some_and(|s| s.eq_ignore_ascii_case("completed"));
            if !all_completed {
                continue;
            }

            let mut reason = ALL_LEGS_COMPLETED.to_string();
            let mut time = None;
            for leg in &group {
                // no exit type: nothing to name, so the time is not matched
                let (Some(exit_time), Some(exit_type)) =
                    (leg.exit_time.as_deref(), leg.exit_type.as_deref())
                else {
                    continue;
                };
                let needle = exit_time.replace('.', ":");
                let needle = needle.trim();
                let in_grid = grid.iter().any(|g| {
                    g.portfolio.as_deref() == Some(portfolio) && g.timestamp.contains(needle)
                });
                if in_grid {
                    reason.push_str(", ");
                    reason.push_str(exit_type.trim());
                    time = Some(exit_time.to_string());
                    break;
                }
            }

            debug!(portfolio, %reason, "all legs completed");
            resolved.insert(portfolio.to_string());
            out.push(ExitReason {
                portfolio: portfolio.to_string(),
                reason,
                time,
            });
        }
    }

    for r in &mut out {
        r.reason = p.clean(&r.reason);
    }
    Ok(out)
}

/// `completed portfolio of <d> <mon>.csv`, taken from a `<d> <Mon> <yyyy>`
/// date in the grid log file name.
pub fn exit_report_file_name(grid_file_name: &str) -> Result<String, IngestError> {
    let re = Regex::new(r"(\d{1,2})\s+([A-Za-z]{3})\s+\d{4}")?;
    let date = match re.captures(grid_file_name) {
        Some(c) => format!("{} {}", &c[1], c[2].to_lowercase()),
        None => "unknown_date".to_string(),
    };
    Ok(format!("completed portfolio of {date}.csv"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn g(msg: &str, portfolio: &str, ts: &str) -> GridEntry {
        GridEntry {
            message: msg.to_string(),
            portfolio: Some(portfolio.to_string()).filter(|p| !p.is_empty()),
            timestamp: ts.to_string(),
        }
    }

    fn leg(portfolio: &str, exit_type: &str, exit_time: &str, status: &str) -> LegEntry {
        let opt = |s: &str| Some(s.to_string()).filter(|s| !s.is_empty());
        LegEntry {
            portfolio: portfolio.to_string(),
            exit_type: opt(exit_type),
            exit_time: opt(exit_time),
            status: opt(status),
        }
    }

    #[test]
    fn repeated_combined_sl_becomes_the_reason() {
        let grid = vec![
            g("Combined SL: 5000 hit", "P1", "27-03-2025 10:00:00"),
            g("Combined SL: 5000 hit", "P1", "27-03-2025 10:00:05"),
            // seen once only: ignored
            g("Combined trail target: 900 hit", "P2", "27-03-2025 11:00:00"),
            g("order placed", "P3", "27-03-2025 09:20:00"),
        ];
        let out = compute_exit_reasons(&grid, &[]).unwrap();
        assert_eq!(
            out,
            vec![ExitReason {
                portfolio: "P1".into(),
                reason: "Combined SL: 5000 hit".into(),
                time: Some("27-03-2025 10:00:05".into()),
            }]
        );
    }

    #[test]
    fn sq_off_legs_merge_with_grid_reasons() {
        let grid = vec![
            g("Combined SL: 100 hit", "P1", "10:00:00"),
            g("Combined SL: 100 hit", "P1", "10:00:01"),
        ];
        let legs = vec![
            leg("P1", "OnSqOffTime", "15:15:00", "completed"),
            leg("P9", "OnSqOffTime", "15:14:00", "completed"),
            leg("P9", "OnSqOffTime", "15:15:30", "completed"),
        ];
        let out = compute_exit_reasons(&grid, &[legs]).unwrap();
        assert_eq!(out.len(), 2);
        // hit phrase wins over the merged OnSqOffTime
        assert_eq!(out[0].reason, "Combined SL: 100 hit");
        assert_eq!(out[0].time.as_deref(), Some("15:15:00"));
        assert_eq!(out[1].portfolio, "P9");
        assert_eq!(out[1].reason, "OnSqOffTime");
        assert_eq!(out[1].time.as_deref(), Some("15:15:30"));
    }

    #[test]
    fn all_legs_completed_uses_matching_exit_type() {
        let grid = vec![
            g("leg exited", "P4", "27-03-2025 14:02:10"),
            g("something", "P5", "27-03-2025 09:00:00"),
        ];
        let legs = vec![
            leg("P4", "SL", "13.59.00", "completed"),
            leg("P4", "Target", "14.02.10", "completed"),
            leg("P5", "SL", "10.00.00", "completed"),
            leg("P5", "SL", "10.00.00", "rejected"),
            leg("P6", "SL", "10.00.00", "completed"),
        ];
        let out = compute_exit_reasons(&grid, &[legs]).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].portfolio, "P4");
        assert_eq!(out[0].reason, "Target");
        assert_eq!(out[0].time.as_deref(), Some("14.02.10"));
    }

    #[test]
    fn all_legs_completed_without_time_match_clears_reason() {
        let grid = vec![g("x", "P7", "27-03-2025 09:00:00")];
        let legs = vec![leg("P7", "SL", "15.00.00", "completed")];
        let out = compute_exit_reasons(&grid, &[legs]).unwrap();
        assert_eq!(out[0].reason, "");
        assert_eq!(out[0].time, None);
    }

    #[test]
    fn legs_without_exit_type_leave_the_time_empty() {
        let grid = vec![g("leg exited", "P8", "27-03-2025 14:02:10")];
        let legs = read_legs(
            "Portfolio Name,Exit Time,Status\nP8,14.02.10,completed\n".as_bytes(),
        )
        .unwrap();
        let out = compute_exit_reasons(&grid, &[legs]).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].portfolio, "P8");
        assert_eq!(out[0].reason, "");
        assert_eq!(out[0].time, None);
    }

    #[test]
    fn file_name_uses_grid_log_date() {
        assert_eq!(
            exit_report_file_name("GridLog 27 Mar 2025.csv").unwrap(),
            "completed portfolio of 27 mar.csv"
        );
        assert_eq!(
            exit_report_file_name("gridlog.csv").unwrap(),
            "completed portfolio of unknown_date.csv"
        );
    }

    #[test]
    fn readers_enforce_columns() {
        assert!(matches!(
            read_grid_log("Message,Timestamp\n".as_bytes()),
            Err(IngestError::MissingColumns(_))
        ));
        let legs = read_legs("Portfolio Name,Status\nP1,completed\n,completed\n".as_bytes()).unwrap();
        assert_eq!(legs.len(), 1);
        assert_eq!(legs[0].exit_time, None);
    }
}
